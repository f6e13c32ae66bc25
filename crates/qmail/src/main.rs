//! `qmail` - compose an HTML email and send it through an SMTP relay.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use qmail::{Dispatcher, Message, RelayConfig};

#[derive(Parser)]
#[command(name = "qmail", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a message and send it
    Send(SendArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Relay configuration (JSON). Defaults to the user config directory.
    #[arg(short, long, value_name = "FILE", env = "QMAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Sender, `email` or `Name <email>`
    #[arg(long, env = "QMAIL_FROM")]
    from: Option<String>,

    /// Primary recipient (repeatable)
    #[arg(long, value_name = "ADDR")]
    to: Vec<String>,

    /// Carbon-copy recipient (repeatable)
    #[arg(long, value_name = "ADDR")]
    cc: Vec<String>,

    /// Blind carbon-copy recipient (repeatable)
    #[arg(long, value_name = "ADDR")]
    bcc: Vec<String>,

    /// Subject line
    #[arg(short, long, default_value = "")]
    subject: String,

    /// HTML body file
    #[arg(long, value_name = "FILE")]
    body: Option<PathBuf>,

    /// File to attach (repeatable)
    #[arg(long, value_name = "FILE")]
    attach: Vec<PathBuf>,

    /// File to embed inline (repeatable). The body refers to it as
    /// `cid:<file name>`, which is replaced by the generated Content-ID
    #[arg(long, value_name = "FILE")]
    inline: Vec<PathBuf>,

    /// Write the serialized message to stdout instead of sending it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    qmail::logging::init(cli.verbose);

    match cli.command {
        Commands::Send(args) => send(args).await,
    }
}

async fn send(args: SendArgs) -> anyhow::Result<()> {
    let mut message = compose(&args)?;

    if args.dry_run {
        let bytes = message.serialize()?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }

    let config_path = match args.config {
        Some(path) => path,
        None => RelayConfig::default_path().context("no configuration directory; pass --config")?,
    };
    let config = RelayConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let relay = config.address();
    Dispatcher::new(config.transport())
        .send(&relay, &config.credentials(), &mut message)
        .await?;

    info!(relay = %relay, "done");
    Ok(())
}

fn compose(args: &SendArgs) -> anyhow::Result<Message> {
    let mut message = Message::new().subject(args.subject.as_str());
    if let Some(from) = &args.from {
        message = message.from(from.as_str());
    }
    for addr in &args.to {
        message = message.to(addr.as_str());
    }
    for addr in &args.cc {
        message = message.cc(addr.as_str());
    }
    for addr in &args.bcc {
        message = message.bcc(addr.as_str());
    }

    for path in &args.attach {
        let name = file_name(path)?;
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        message.attach(name, file)?;
    }

    let mut content_ids = Vec::with_capacity(args.inline.len());
    for path in &args.inline {
        let name = file_name(path)?;
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let content_id = message.inline_attach(name.as_str(), file)?;
        eprintln!("{name}: cid:{content_id}");
        content_ids.push((name, content_id));
    }

    if let Some(path) = &args.body {
        let body = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        message.set_body(Cursor::new(link_inline_ids(&body, &content_ids)));
    }

    Ok(message)
}

/// Rewrites `cid:<name>` references in `body` to `cid:<content id>` for each
/// `(name, content id)` pair.
///
/// Longer names are replaced first so `cid:logo.png` never clobbers part of
/// `cid:logo.png.old`.
fn link_inline_ids(body: &str, content_ids: &[(String, String)]) -> String {
    let mut ordered: Vec<_> = content_ids.iter().collect();
    ordered.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

    let mut linked = body.to_string();
    for (name, content_id) in ordered {
        linked = linked.replace(&format!("cid:{name}"), &format!("cid:{content_id}"));
    }
    linked
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    match path.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("not a file: {}", path.display()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, id)| ((*name).to_string(), (*id).to_string()))
            .collect()
    }

    #[test]
    fn test_inline_references_get_generated_ids() {
        let body = r#"<img src="cid:logo.png"><img src="cid:chart.svg"><p>cid:logo.png</p>"#;
        let linked = link_inline_ids(body, &ids(&[("logo.png", "id-1"), ("chart.svg", "id-2")]));
        assert_eq!(
            linked,
            r#"<img src="cid:id-1"><img src="cid:id-2"><p>cid:id-1</p>"#
        );
    }

    #[test]
    fn test_longer_names_are_not_clobbered() {
        let body = r#"<img src="cid:logo.png"><img src="cid:logo.png.old">"#;
        let linked = link_inline_ids(body, &ids(&[("logo.png", "new"), ("logo.png.old", "old")]));
        assert_eq!(linked, r#"<img src="cid:new"><img src="cid:old">"#);
    }

    #[test]
    fn test_body_without_references_is_unchanged() {
        let body = "<p>no images</p>";
        assert_eq!(link_inline_ids(body, &ids(&[("logo.png", "id-1")])), body);
        assert_eq!(link_inline_ids(body, &[]), body);
    }

    #[test]
    fn test_compose_links_body_to_inline_parts() {
        let dir = std::env::temp_dir().join(format!("qmail-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let body_path = dir.join("body.html");
        let logo_path = dir.join("logo.png");
        fs::write(&body_path, r#"<img src="cid:logo.png">"#).unwrap();
        fs::write(&logo_path, b"png").unwrap();

        let cli = Cli::parse_from([
            "qmail",
            "send",
            "--from",
            "alice@example.com",
            "--to",
            "bob@example.com",
            "--body",
            body_path.to_str().unwrap(),
            "--inline",
            logo_path.to_str().unwrap(),
        ]);
        let Commands::Send(args) = cli.command;
        let mut message = compose(&args).unwrap();
        let content_id = message.content_id("logo.png").unwrap().to_string();
        let text = String::from_utf8(message.serialize().unwrap()).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert!(text.contains(&format!(r#"<img src="cid:{content_id}">"#)));
        assert!(text.contains(&format!("Content-ID: <{content_id}>")));
        assert!(!text.contains("cid:logo.png"));
    }
}
