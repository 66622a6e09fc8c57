use crate::domain_model::{EmailAddress, OtpCode};
use crate::domain_port::{Mailer, TransportError};
use crate::settings::Smtp;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// One long-lived relay client, built from settings at startup. "Sent"
/// means the relay accepted the message, nothing more.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    send_timeout: Duration,
}

impl SmtpMailer {
    pub fn try_new(settings: &Smtp) -> anyhow::Result<Self> {
        let credentials =
            Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
            .credentials(credentials)
            .build();
        let from = settings.from_address.parse::<Mailbox>()?;

        Ok(Self {
            transport,
            from,
            send_timeout: Duration::from_secs(settings.send_timeout_secs),
        })
    }

    fn render_body(code: &OtpCode, valid_for: Duration) -> String {
        format!(
            "Your verification code is {}.\n\n\
             It expires in {} minutes. If you did not request it, you can\n\
             safely ignore this message.\n",
            code.as_str(),
            valid_for.as_secs() / 60,
        )
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn deliver_code(
        &self,
        to: &EmailAddress,
        code: &OtpCode,
        valid_for: Duration,
    ) -> Result<(), TransportError> {
        let to = to
            .as_str()
            .parse::<Mailbox>()
            .map_err(|e| TransportError::Message(e.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(Self::render_body(code, valid_for))
            .map_err(|e| TransportError::Message(e.to_string()))?;

        match tokio::time::timeout(self.send_timeout, self.transport.send(message)).await {
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
            Ok(Err(e)) => Err(TransportError::Relay(e.to_string())),
            Ok(Ok(_)) => Ok(()),
        }
    }
}
