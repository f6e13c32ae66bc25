//! Envelope properties checked through the public dispatcher API.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use proptest::prelude::*;
use qmail::{Credentials, Dispatcher, Error, Message, RelayAddress, Transport};

#[derive(Default)]
struct Capture {
    sent: Mutex<Option<(Vec<String>, Vec<u8>)>>,
}

impl Transport for Capture {
    async fn send_mail(
        &self,
        _relay: &RelayAddress,
        _credentials: &Credentials,
        _from: &str,
        recipients: &[String],
        message: &[u8],
    ) -> qmail_smtp::Result<()> {
        *self.sent.lock().unwrap() = Some((recipients.to_vec(), message.to_vec()));
        Ok(())
    }
}

fn emails(prefix: &'static str) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 0..4).prop_map(move |locals| {
        locals
            .into_iter()
            .enumerate()
            .map(|(i, local)| format!("{prefix}{i}.{local}@example.com"))
            .collect()
    })
}

fn dispatch(to: &[String], cc: &[String], bcc: &[String]) -> Result<Capture, Error> {
    let mut message = Message::new().from("sender@example.com").subject("s");
    message.to.extend(to.iter().map(|e| e.as_str().into()));
    message.cc.extend(cc.iter().map(|e| e.as_str().into()));
    message.bcc.extend(bcc.iter().map(|e| e.as_str().into()));

    let dispatcher = Dispatcher::new(Capture::default());
    let relay = RelayAddress::new("localhost", 25);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(dispatcher.send(&relay, &Credentials::None, &mut message))?;

    let sent = dispatcher.transport().sent.lock().unwrap().take();
    Ok(Capture {
        sent: Mutex::new(sent),
    })
}

proptest! {
    #[test]
    fn envelope_is_to_cc_bcc_in_order(
        to in emails("to"),
        cc in emails("cc"),
        bcc in emails("bcc"),
    ) {
        let expected: Vec<String> = to.iter().chain(&cc).chain(&bcc).cloned().collect();

        match dispatch(&to, &cc, &bcc) {
            Ok(capture) => {
                let (recipients, bytes) = capture.sent.into_inner().unwrap().unwrap();
                prop_assert_eq!(&recipients, &expected);

                let text = String::from_utf8(bytes).unwrap();
                for hidden in &bcc {
                    prop_assert!(!text.contains(hidden.as_str()));
                }
                for visible in to.iter().chain(&cc) {
                    prop_assert!(text.contains(visible.as_str()));
                }
            }
            Err(err) => {
                prop_assert!(expected.is_empty());
                prop_assert!(matches!(err, Error::NoRecipients));
            }
        }
    }
}
