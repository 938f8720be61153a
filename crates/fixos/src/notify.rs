//! WhatsApp status notifications as `wa.me` deep links.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::form_urlencoded;

use crate::config::NotifyConfig;
use crate::error::{Error, Result};
use crate::model::{Customer, ServiceOrder};
use crate::money::format_brl;
use crate::remote::RemoteStore;
use crate::repository::Repository;
use crate::settings;

const WA_BASE: &str = "https://wa.me/";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(cliente|os|status|total|empresa)\}").expect("valid placeholder pattern")
});

/// Values substituted into a message template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    /// `{cliente}`
    pub customer: String,
    /// `{os}`
    pub order_number: String,
    /// `{status}`
    pub status: String,
    /// `{total}`, already formatted.
    pub total: String,
    /// `{empresa}`
    pub business: String,
}

impl MessageFields {
    /// Fields for an order, its customer and the shop name.
    #[must_use]
    pub fn for_order(order: &ServiceOrder, customer: &Customer, business: &str) -> Self {
        Self {
            customer: customer.name.clone(),
            order_number: order.order_number.to_string(),
            status: order.status.label().to_string(),
            total: format_brl(order.total),
            business: business.to_string(),
        }
    }
}

/// Replace the known placeholders. Unknown braces are left alone.
#[must_use]
pub fn render_message(template: &str, fields: &MessageFields) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "cliente" => fields.customer.clone(),
            "os" => fields.order_number.clone(),
            "status" => fields.status.clone(),
            "total" => fields.total.clone(),
            "empresa" => fields.business.clone(),
            other => format!("{{{other}}}"),
        })
        .into_owned()
}

/// Digits of a phone number with the country code in front.
///
/// National numbers (10 or 11 digits: area code plus number) get
/// `country_code` prefixed. Returns `None` when there are no digits.
#[must_use]
pub fn normalize_phone(phone: &str, country_code: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    match digits.len() {
        0 => None,
        10 | 11 => Some(format!("{country_code}{digits}")),
        _ => Some(digits.to_string()),
    }
}

/// Percent-encode a message for a URL query, spaces as `%20`.
#[must_use]
pub fn encode_message(message: &str) -> String {
    // byte_serialize writes spaces as '+' and escapes a literal '+' as %2B.
    form_urlencoded::byte_serialize(message.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// `https://wa.me/<digits>?text=<message>`.
///
/// # Errors
///
/// Returns a validation error when the phone has no digits.
pub fn whatsapp_link(phone: &str, message: &str, country_code: &str) -> Result<String> {
    let number = normalize_phone(phone, country_code)
        .ok_or_else(|| Error::validation("Cliente sem WhatsApp cadastrado."))?;
    Ok(format!("{WA_BASE}{number}?text={}", encode_message(message)))
}

/// Deep link telling an order's customer its current status.
///
/// # Errors
///
/// Returns an error when the order or customer does not exist, or the
/// customer has no phone.
pub async fn order_notification<R: RemoteStore>(
    repo: &Repository<R>,
    config: &NotifyConfig,
    order_id: &str,
) -> Result<String> {
    let order = repo.require::<ServiceOrder>(order_id).await?;
    let customer = repo.require::<Customer>(&order.customer_id).await?;
    let business = settings::business_info(repo).await?;

    let message = render_message(
        &config.template,
        &MessageFields::for_order(&order, &customer, &business.name),
    );
    whatsapp_link(&customer.phone, &message, &config.country_code)
}
