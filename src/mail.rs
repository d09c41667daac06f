//! Mail
//!
//! Outbound transactional email: the popup welcome message and the
//! post-payment order confirmation.
//!
//! Delivery is always best effort. A checkout that has already charged
//! the shopper must not fail because the confirmation could not be sent,
//! so failures are logged and swallowed at the call sites that need
//! that.

use thiserror::Error;

/// Errors related to sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// The mail transport rejected or failed to deliver the message.
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// What a message is for. Templates and analytics key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Welcome message carrying the earned discount code.
    Welcome,

    /// Order confirmation after a successful payment.
    OrderConfirmation,
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    pub body: String,

    /// Message classification.
    pub kind: MessageKind,
}

/// A mail transport.
pub trait Mailer {
    /// Hand `message` to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Delivery`] when the transport cannot deliver.
    fn send(&mut self, message: &OutboundEmail) -> Result<(), MailError>;
}

/// Transport that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMailer;

impl Mailer for NoopMailer {
    fn send(&mut self, _message: &OutboundEmail) -> Result<(), MailError> {
        Ok(())
    }
}

/// Transport that records messages instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    /// Every message handed to [`Mailer::send`], in order.
    pub sent: Vec<OutboundEmail>,
}

impl Mailer for RecordingMailer {
    fn send(&mut self, message: &OutboundEmail) -> Result<(), MailError> {
        self.sent.push(message.clone());

        Ok(())
    }
}

/// Send `message`, logging a warning instead of failing when the
/// transport does.
pub fn send_best_effort(mailer: &mut dyn Mailer, message: &OutboundEmail) {
    if let Err(err) = mailer.send(message) {
        tracing::warn!(%err, to = %message.to, "could not deliver email; continuing");
    }
}

/// The welcome message granting `code` to a new subscriber.
#[must_use]
pub fn welcome_message(to: &str, code: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_owned(),
        subject: "Tu código de descuento de NextSite".to_owned(),
        body: format!(
            "¡Gracias por suscribirte! Usa el código {code} para obtener un 10% de descuento en tu primer pedido."
        ),
        kind: MessageKind::Welcome,
    }
}

/// The order confirmation for a completed payment.
#[must_use]
pub fn confirmation_message(to: &str, reference: &str, total: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_owned(),
        subject: format!("Confirmación de pedido {reference}"),
        body: format!("Hemos recibido tu pago de {total}. Referencia: {reference}."),
        kind: MessageKind::OrderConfirmation,
    }
}
