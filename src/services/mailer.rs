// src/services/mailer.rs

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::{common::error::AppError, config::SmtpSettings};

/// Um e-mail de texto puro já montado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), AppError>;
}

/// Escolhe SMTP quando configurado; senão, só registra no log.
pub fn from_settings(settings: Option<&SmtpSettings>) -> anyhow::Result<Arc<dyn Mailer>> {
    match settings {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp)?)),
        None => {
            tracing::warn!("SMTP no configurado; los e-mails solo se registran en el log");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpSettings) -> anyhow::Result<Self> {
        let from: Mailbox = smtp
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("SMTP_FROM inválido: {}", e))?;

        let credentials = match (&smtp.username, &smtp.password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        };

        let transport = if smtp.starttls {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);
            if let Some(c) = credentials {
                builder = builder.credentials(c);
            }
            builder.build()
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host).port(smtp.port);
            if let Some(c) = credentials {
                builder = builder.credentials(c);
            }
            builder.build()
        };

        tracing::info!(host = %smtp.host, port = smtp.port, starttls = smtp.starttls, "Mailer SMTP inicializado");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Destinatario inválido: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| anyhow::anyhow!("Falha ao montar o e-mail: {}", e))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("Falha no envio SMTP: {}", e))?;

        tracing::info!(to = %email.to, subject = %email.subject, "E-mail enviado");
        Ok(())
    }
}

/// Ambiente sem SMTP: o conteúdo vai para o log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        tracing::info!(to = %email.to, subject = %email.subject, body = %email.body, "E-mail (solo log)");
        Ok(())
    }
}
