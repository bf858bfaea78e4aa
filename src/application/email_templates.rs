use crate::domain::entities::{donation_frequency::DonationFrequency, money::display_amount};

const BRAND_NAME: &str = "Donations";

/// Values a donation confirmation, receipt, or cancellation notice renders.
#[derive(Debug, Clone)]
pub struct DonationSummary<'a> {
    pub donor_name: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub frequency: DonationFrequency,
    pub donation_type: &'a str,
    pub payment_method: &'a str,
    pub receipt_number: &'a str,
    pub date_label: &'a str,
}

pub fn donation_confirmation_email(
    site_origin: &str,
    donation: &DonationSummary<'_>,
    manage_url: Option<&str>,
) -> (String, String) {
    let amount = display_amount(donation.amount_cents, donation.currency);
    let subject = if donation.frequency.is_recurring() {
        format!("Thank you for your {} donation", donation.frequency)
    } else {
        "Thank you for your donation".to_string()
    };
    let headline = "Thank you for your gift";
    let lead = format!(
        "Dear {}, we received your donation of <strong>{}</strong>.",
        escape_html(donation.donor_name),
        amount
    );

    let mut body = detail_table(donation);
    if let Some(url) = manage_url {
        body.push_str(&format!(
            r#"<p style="margin:16px 0 0;color:#374151;">Your gift repeats {}. You can review or cancel it at any time.</p>{}"#,
            donation.frequency,
            primary_button(url, "Manage your donation")
        ));
    }
    let reason = "you made a donation";

    let html = wrap_email(
        site_origin,
        headline,
        &lead,
        &body,
        reason,
        Some("Please keep this email for your records."),
    );
    (subject, html)
}

pub fn cancellation_confirmation_email(
    site_origin: &str,
    donor_name: &str,
    amount_cents: i64,
    currency: &str,
    frequency: DonationFrequency,
) -> (String, String) {
    let subject = "Your recurring donation has been cancelled".to_string();
    let headline = "Recurring donation cancelled";
    let lead = format!(
        "Dear {}, your {} donation of <strong>{}</strong> has been cancelled.",
        escape_html(donor_name),
        frequency,
        display_amount(amount_cents, currency)
    );
    let body = r#"<p style="margin:12px 0 0;color:#374151;">No further payments will be taken. Thank you for everything you have given so far.</p>"#;
    let reason = "you cancelled a recurring donation";

    let html = wrap_email(site_origin, headline, &lead, body, reason, None);
    (subject, html)
}

pub fn management_link_email(site_origin: &str, manage_url: &str) -> (String, String) {
    let subject = "Manage your recurring donation".to_string();
    let headline = "Manage your recurring donation";
    let lead = "Use the button below to review or cancel your recurring donation.";
    let body = format!(
        r#"{}<p style="margin:12px 0 0;color:#374151;">This link expires soon and can only be used by you.</p>"#,
        primary_button(manage_url, "Manage your donation")
    );
    let reason = "someone asked for a donation management link for this address";

    let html = wrap_email(site_origin, headline, lead, &body, reason, None);
    (subject, html)
}

/// Standalone HTML receipt archived by the receipt generator.
pub fn donation_receipt_document(site_origin: &str, donation: &DonationSummary<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="utf-8"><title>Receipt {receipt}</title></head>
  <body style="font-family:Arial,Helvetica,sans-serif;color:#111827;margin:32px;">
    <h1 style="font-size:22px;margin:0 0 4px;">Donation receipt</h1>
    <p style="margin:0 0 16px;color:#6b7280;">{brand} - {origin}</p>
    <p style="margin:0 0 16px;">Received with thanks from <strong>{name}</strong>.</p>
    {details}
  </body>
</html>
"#,
        receipt = escape_html(donation.receipt_number),
        brand = BRAND_NAME,
        origin = origin_label(site_origin),
        name = escape_html(donation.donor_name),
        details = detail_table(donation),
    )
}

fn detail_table(donation: &DonationSummary<'_>) -> String {
    let rows = [
        ("Receipt number", donation.receipt_number.to_string()),
        ("Date", donation.date_label.to_string()),
        (
            "Amount",
            display_amount(donation.amount_cents, donation.currency),
        ),
        ("Frequency", donation.frequency.to_string()),
        ("Designation", donation.donation_type.to_string()),
        ("Payment method", donation.payment_method.to_string()),
    ];

    let rows_html: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<tr><td style="padding:4px 12px 4px 0;color:#6b7280;">{}</td><td style="padding:4px 0;color:#111827;">{}</td></tr>"#,
                label,
                escape_html(value)
            )
        })
        .collect();

    format!(
        r#"<table style="margin:12px 0;border-collapse:collapse;font-size:14px;">{}</table>"#,
        rows_html
    )
}

pub fn primary_button(url: &str, label: &str) -> String {
    format!(
        r#"<a href="{url}" style="display:inline-block;margin:12px 0;padding:12px 20px;background:#111827;color:#ffffff;text-decoration:none;border-radius:8px;font-weight:600;">{label}</a>"#,
        url = escape_html(url),
        label = label
    )
}

pub fn wrap_email(
    site_origin: &str,
    headline: &str,
    lead: &str,
    body_html: &str,
    reason: &str,
    footer_note: Option<&str>,
) -> String {
    let origin = origin_label(site_origin);
    let footer_note = footer_note
        .map(|note| {
            format!(
                r#"<p style="margin:8px 0 0;color:#4b5563;font-size:13px;">{}</p>"#,
                note
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background:#f8fafc;margin:0;padding:24px;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:560px;margin:0 auto;background:#ffffff;border:1px solid #e5e7eb;border-radius:12px;padding:24px;">
      <div style="font-size:12px;letter-spacing:0.08em;text-transform:uppercase;color:#6b7280;">{brand} - {origin}</div>
      <h1 style="margin:12px 0 8px;font-size:22px;color:#111827;">{headline}</h1>
      <p style="margin:0 0 12px;font-size:15px;color:#111827;line-height:1.6;">{lead}</p>
      {body_html}
      <div style="margin-top:20px;padding-top:16px;border-top:1px solid #e5e7eb;">
        <p style="margin:0;font-size:13px;color:#4b5563;">Why you got this email: {reason}.</p>
        {footer_note}
      </div>
    </div>
  </body>
</html>
"#,
        brand = BRAND_NAME,
        origin = origin,
        headline = headline,
        lead = lead,
        body_html = body_html,
        reason = reason,
        footer_note = footer_note,
    )
}

fn origin_label(site_origin: &str) -> String {
    site_origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Escape donor-supplied text before it is interpolated into HTML.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
