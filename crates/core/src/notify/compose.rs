use crate::config::Settings;
use crate::domain::listing::ListingRecord;
use crate::notify::Notification;
use std::fmt::Write;

pub const SUBJECT: &str = "Houses for Sale Notification";
pub const PREAMBLE: &str =
    "These are houses for sale in the zip codes and within the price ranges.\n\n";

/// Builds the summary email, or `None` when there is nothing to report.
pub fn compose(records: &[ListingRecord], settings: &Settings) -> Option<Notification> {
    if records.is_empty() {
        return None;
    }

    let mut body = String::from(PREAMBLE);
    body.push_str(&render_table(records));

    for record in records {
        let link = match record.detail_url.as_deref() {
            Some(url) => detail_link(&settings.provider.detail_base_url, url),
            None => "n/a".to_string(),
        };
        // Writing into a String cannot fail.
        let _ = write!(body, "\n\nAddress: {}\nLink: {link}", record.address);
    }

    Some(Notification {
        from: settings.email.sender_email.clone(),
        to: settings.email.receiver_emails.clone(),
        subject: SUBJECT.to_string(),
        body,
    })
}

/// Absolute link to a listing's detail page.
pub fn detail_link(base_url: &str, detail_url: &str) -> String {
    if detail_url.starts_with("http://") || detail_url.starts_with("https://") {
        return detail_url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if detail_url.starts_with('/') {
        format!("{base}{detail_url}")
    } else {
        format!("{base}/{detail_url}")
    }
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

/// Address, zip code and price as aligned plain-text columns.
fn render_table(records: &[ListingRecord]) -> String {
    let rows: Vec<[String; 3]> = records
        .iter()
        .map(|r| [r.address.clone(), r.zip_code.to_string(), format_price(r.price)])
        .collect();

    let header = ["address", "zipcode", "price"];
    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = write!(
        out,
        "{:<aw$}  {:>zw$}  {:>pw$}",
        header[0],
        header[1],
        header[2],
        aw = widths[0],
        zw = widths[1],
        pw = widths[2]
    );
    for [address, zip, price] in &rows {
        let _ = write!(
            out,
            "\n{:<aw$}  {:>zw$}  {:>pw$}",
            address,
            zip,
            price,
            aw = widths[0],
            zw = widths[1],
            pw = widths[2]
        );
    }
    out
}
