use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context};

use crate::contact::Notifier;

use super::{EngagementSession, EngagementSnapshot};

/// One line of the session script read by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Unlock(String),
    Project(String),
    Menu,
    ChatOpen,
    ChatClose,
    Message(String),
    Contact(String),
    Back,
    Wait(u64),
    Status,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let argument = |name: &str| -> anyhow::Result<String> {
            if rest.is_empty() {
                bail!("`{verb}` needs a {name}");
            }
            Ok(rest.to_string())
        };

        let command = match verb {
            "unlock" => Command::Unlock(argument("key")?),
            "project" => Command::Project(argument("key")?),
            "menu" => Command::Menu,
            "chat" => match rest {
                "open" => Command::ChatOpen,
                "close" => Command::ChatClose,
                other => bail!("`chat` expects open or close, got '{other}'"),
            },
            // The message may legitimately be blank; validation reports it.
            "message" => Command::Message(rest.to_string()),
            "contact" => Command::Contact(rest.to_string()),
            "back" => Command::Back,
            "wait" => Command::Wait(
                argument("duration in ms")?
                    .parse()
                    .with_context(|| format!("invalid wait duration '{rest}'"))?,
            ),
            "status" => Command::Status,
            "" => return Err(anyhow!("empty command")),
            other => bail!("unknown command '{other}'"),
        };
        Ok(command)
    }
}

pub async fn run_command<N: Notifier>(
    session: &EngagementSession<N>,
    command: Command,
) -> Result<EngagementSnapshot, String> {
    match command {
        Command::Unlock(key) => {
            session.unlock_key(&key).map_err(|e| e.to_string())?;
        }
        Command::Project(key) => {
            session.open_project(&key).map_err(|e| e.to_string())?;
        }
        Command::Menu => {
            session.use_menu();
        }
        Command::ChatOpen => session.contact().open(),
        Command::ChatClose => session.contact().close(),
        Command::Message(text) => {
            let contact = session.contact();
            contact.set_message_text(text);
            contact.submit_message().map_err(|e| e.to_string())?;
        }
        Command::Contact(value) => {
            let contact = session.contact();
            contact.set_contact_value(value);
            contact.submit_contact().await.map_err(|e| e.to_string())?;
        }
        Command::Back => session.contact().back(),
        Command::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        Command::Status => {}
    }

    Ok(session.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contact::{ContactStage, DeliveryError},
        flags::PersistentFlags,
        models::ContactPayload,
        settings::EngagementSettings,
    };

    struct NullNotifier;

    impl Notifier for NullNotifier {
        async fn send(&self, _payload: ContactPayload) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[test]
    fn parses_every_verb() {
        assert_eq!(
            "unlock education".parse::<Command>().unwrap(),
            Command::Unlock("education".into())
        );
        assert_eq!(
            "project  cyberpong ".parse::<Command>().unwrap(),
            Command::Project("cyberpong".into())
        );
        assert_eq!("menu".parse::<Command>().unwrap(), Command::Menu);
        assert_eq!("chat open".parse::<Command>().unwrap(), Command::ChatOpen);
        assert_eq!("chat close".parse::<Command>().unwrap(), Command::ChatClose);
        assert_eq!(
            "message Hello there".parse::<Command>().unwrap(),
            Command::Message("Hello there".into())
        );
        assert_eq!(
            "message".parse::<Command>().unwrap(),
            Command::Message(String::new())
        );
        assert_eq!(
            "contact a@b.co".parse::<Command>().unwrap(),
            Command::Contact("a@b.co".into())
        );
        assert_eq!("back".parse::<Command>().unwrap(), Command::Back);
        assert_eq!("wait 250".parse::<Command>().unwrap(), Command::Wait(250));
        assert_eq!("status".parse::<Command>().unwrap(), Command::Status);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "unlock", "chat maybe", "wait soon", "dance"] {
            assert!(line.parse::<Command>().is_err(), "{line:?} should fail");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_contact_flow_reports_errors_and_progress() {
        let session = EngagementSession::new(
            PersistentFlags::in_memory(),
            NullNotifier,
            &EngagementSettings::default(),
        );

        run_command(&session, Command::ChatOpen).await.unwrap();
        let err = run_command(&session, Command::Message(String::new()))
            .await
            .unwrap_err();
        assert_eq!(err, "please enter a message");

        let snapshot = run_command(&session, Command::Message("Hello".into()))
            .await
            .unwrap();
        assert_eq!(snapshot.contact.stage, ContactStage::Contact);

        let snapshot = run_command(&session, Command::Contact("user@example.com".into()))
            .await
            .unwrap();
        assert!(snapshot.contact.is_success);

        let snapshot = run_command(&session, Command::Wait(2500)).await.unwrap();
        assert!(!snapshot.contact.is_open);
        assert_eq!(snapshot.contact.stage, ContactStage::Message);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_item_is_reported() {
        let session = EngagementSession::new(
            PersistentFlags::in_memory(),
            NullNotifier,
            &EngagementSettings::default(),
        );
        let err = run_command(&session, Command::Unlock("ghost".into()))
            .await
            .unwrap_err();
        assert!(err.contains("ghost"));
    }
}
