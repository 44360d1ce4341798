pub mod compose;
pub mod smtp;

use crate::config::Settings;
use crate::domain::listing::ListingRecord;
use crate::error::Result;

pub use compose::{compose, detail_link};
pub use smtp::SmtpMailer;

/// A composed plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationResult {
    NoMatches,
    Sent { recipients: usize },
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Emails the filtered set to the configured receivers. Nothing is sent for an
/// empty set. Delivery failures are returned, never retried.
pub async fn notify(
    records: &[ListingRecord],
    settings: &Settings,
    mailer: &dyn Mailer,
) -> Result<NotificationResult> {
    let Some(notification) = compose(records, settings) else {
        tracing::info!("no properties found matching the criteria");
        return Ok(NotificationResult::NoMatches);
    };

    mailer.send(&notification).await?;

    let recipients = notification.to.len();
    tracing::info!(recipients, listings = records.len(), "email notification sent");
    Ok(NotificationResult::Sent { recipients })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, notification: &Notification) -> Result<()> {
            if self.fail {
                return Err(Error::Delivery("535 authentication failed".to_string()));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn settings() -> Settings {
        Settings::from_toml_str(
            r#"
            api_key = "k"
            listing_url = "https://www.zillow.com/atlanta-ga/"
            zip_codes_to_check = [30301]

            [email_config]
            sender_email = "alerts@example.com"
            receiver_emails = ["a@example.com", "b@example.com"]
            smtp_password = "p"
            "#,
            |_| None,
        )
        .unwrap()
    }

    fn record(address: &str, price: f64, detail_url: &str) -> ListingRecord {
        ListingRecord {
            zpid: None,
            address: address.to_string(),
            zip_code: 30301,
            price,
            bedrooms: None,
            bathrooms: None,
            living_area: None,
            home_type: None,
            status_type: None,
            latitude: None,
            longitude: None,
            detail_url: Some(detail_url.to_string()),
            attributes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn empty_set_sends_nothing() {
        let mailer = RecordingMailer::default();
        let res = notify(&[], &settings(), &mailer).await.unwrap();
        assert_eq!(res, NotificationResult::NoMatches);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_summary_to_all_receivers() {
        let mailer = RecordingMailer::default();
        let records = [
            record("123 Main St", 150000.0, "/homedetails/123-Main-St/123_zpid"),
            record("9 Oak Ave", 99000.0, "/homedetails/9-Oak-Ave/9_zpid"),
        ];

        let res = notify(&records, &settings(), &mailer).await.unwrap();
        assert_eq!(res, NotificationResult::Sent { recipients: 2 });

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let n = &sent[0];
        assert_eq!(n.from, "alerts@example.com");
        assert_eq!(n.to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(n.subject, "Houses for Sale Notification");
        assert!(n.body.starts_with(compose::PREAMBLE));
        assert!(n.body.contains("123 Main St"));
        assert!(n.body.contains("150000"));
        assert!(n
            .body
            .contains("Address: 123 Main St\nLink: https://www.zillow.com/homedetails/123-Main-St/123_zpid"));
        assert!(n
            .body
            .ends_with("Address: 9 Oak Ave\nLink: https://www.zillow.com/homedetails/9-Oak-Ave/9_zpid"));
    }

    #[tokio::test]
    async fn table_lists_every_record_in_order() {
        let records = [record("first", 1.0, "/a"), record("second", 2.0, "/b")];
        let n = compose(&records, &settings()).unwrap();
        let table: Vec<&str> = n.body[compose::PREAMBLE.len()..]
            .lines()
            .take(3)
            .collect();
        assert!(table[0].starts_with("address"));
        assert!(table[1].starts_with("first"));
        assert!(table[2].starts_with("second"));
        assert!(table[1].contains("30301"));
    }

    #[tokio::test]
    async fn delivery_failure_is_returned() {
        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        let records = [record("123 Main St", 150000.0, "/x")];
        let err = notify(&records, &settings(), &mailer).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }
}
