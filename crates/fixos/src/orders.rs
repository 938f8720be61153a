//! Service order workflow: numbering, totals, history, closing and the
//! per-order logs (checklist, occurrences, photos).

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    new_id, Customer, Equipment, HistoryEntry, LineItem, Occurrence, OccurrenceKind, OrderStatus,
    PaymentStatus, Product, ServiceOrder,
};
use crate::remote::RemoteStore;
use crate::repository::Repository;
use crate::settings;

/// Order number given to the first order.
pub const FIRST_ORDER_NUMBER: u32 = 1001;

/// History note appended on every save.
pub const SAVE_NOTE: &str = "Registro salvo/atualizado";

/// Device an order is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentChoice {
    /// A device already on file.
    Existing(String),
    /// A device registered together with the order. Its owner is set to the
    /// order's customer.
    New(Equipment),
}

/// Items plus labor plus diagnosis fee.
#[must_use]
pub fn order_total(order: &ServiceOrder) -> Decimal {
    order.items.iter().map(LineItem::subtotal).sum::<Decimal>() + order.labor_cost + order.diagnosis_fee
}

/// Items at cost plus the labor cost base.
#[must_use]
pub fn order_total_cost(order: &ServiceOrder) -> Decimal {
    order.items.iter().map(LineItem::cost_subtotal).sum::<Decimal>()
        + order.labor_cost_base.unwrap_or(Decimal::ZERO)
}

/// Number for the next new order.
#[must_use]
pub fn next_order_number(orders: &[ServiceOrder]) -> u32 {
    orders
        .iter()
        .map(|o| o.order_number)
        .max()
        .map_or(FIRST_ORDER_NUMBER, |max| max.saturating_add(1))
}

/// Last day of warranty for a device delivered on `delivered`.
#[must_use]
pub fn warranty_expiry(delivered: NaiveDate, warranty_days: u32) -> NaiveDate {
    delivered
        .checked_add_days(Days::new(u64::from(warranty_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Whether an order is still covered on `today`.
#[must_use]
pub fn under_warranty(order: &ServiceOrder, today: NaiveDate) -> bool {
    order
        .warranty_expiry_date
        .is_some_and(|expiry| today <= expiry)
}

/// Keep orders whose number or customer name contains `query`.
#[must_use]
pub fn search_orders(
    orders: Vec<ServiceOrder>,
    customers: &[Customer],
    query: &str,
) -> Vec<ServiceOrder> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return orders;
    }
    orders
        .into_iter()
        .filter(|order| {
            order.order_number.to_string().contains(&needle)
                || customers
                    .iter()
                    .find(|c| c.id == order.customer_id)
                    .is_some_and(|c| c.name.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Devices owned by a customer.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn customer_equipment<R: RemoteStore>(
    repo: &Repository<R>,
    customer_id: &str,
) -> Result<Vec<Equipment>> {
    Ok(repo
        .list::<Equipment>()
        .await?
        .into_iter()
        .filter(|e| e.customer_id == customer_id)
        .collect())
}

/// Register a customer from the order screen. Name and phone are required.
///
/// # Errors
///
/// Returns a validation error when name or phone is blank.
pub async fn quick_customer<R: RemoteStore>(
    repo: &Repository<R>,
    name: &str,
    phone: &str,
) -> Result<Customer> {
    let customer = Customer::new(name.trim(), phone.trim());
    customer.validate_quick()?;
    repo.save(&customer).await?;
    Ok(customer)
}

/// A blank order for `customer_id` with the configured warranty.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn new_order<R: RemoteStore>(
    repo: &Repository<R>,
    customer_id: &str,
) -> Result<ServiceOrder> {
    Ok(ServiceOrder {
        customer_id: customer_id.to_string(),
        warranty_days: settings::default_warranty(repo).await?,
        ..ServiceOrder::default()
    })
}

/// Validate and save an order, registering its device when new.
///
/// # Errors
///
/// Returns a validation error when the customer or device is missing, or an
/// error when the local store fails.
pub async fn save_order<R: RemoteStore>(
    repo: &Repository<R>,
    mut order: ServiceOrder,
    equipment: EquipmentChoice,
) -> Result<ServiceOrder> {
    if order.customer_id.trim().is_empty() {
        return Err(Error::validation("Selecione um cliente."));
    }
    repo.require::<Customer>(&order.customer_id).await?;

    order.equipment_id = match equipment {
        EquipmentChoice::Existing(id) => {
            if id.trim().is_empty() {
                return Err(Error::validation("Selecione ou cadastre um equipamento."));
            }
            repo.require::<Equipment>(&id).await?.id
        }
        EquipmentChoice::New(mut device) => {
            device.validate()?;
            if device.id.is_empty() {
                device.id = new_id();
            }
            device.customer_id.clone_from(&order.customer_id);
            repo.save(&device).await?;
            info!(equipment = %device.id, "registered equipment with order");
            device.id
        }
    };

    commit(repo, order).await
}

/// Stamp, total and store an order, appending a history entry.
async fn commit<R: RemoteStore>(repo: &Repository<R>, mut order: ServiceOrder) -> Result<ServiceOrder> {
    let now = Utc::now();

    if order.is_new() {
        let existing = repo.list::<ServiceOrder>().await?;
        order.id = new_id();
        order.order_number = next_order_number(&existing);
        order.created_at = now;
    }
    order.updated_at = now;
    order.total = order_total(&order);
    order.total_cost = order_total_cost(&order);

    if order.status == OrderStatus::Delivered && order.warranty_expiry_date.is_none() {
        order.warranty_expiry_date = Some(warranty_expiry(now.date_naive(), order.warranty_days));
    }

    order.history.push(HistoryEntry {
        status: order.status,
        timestamp: now,
        note: Some(SAVE_NOTE.to_string()),
    });

    repo.save(&order).await?;
    debug!(order = order.order_number, status = %order.status, "saved order");
    Ok(order)
}

/// Move an order to another status.
///
/// # Errors
///
/// Returns an error when the order does not exist or the local store fails.
pub async fn update_status<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    status: OrderStatus,
) -> Result<ServiceOrder> {
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    order.status = status;
    commit(repo, order).await
}

/// Load an order, apply `edit` and save it through the same checks as
/// [`save_order`]. The order keeps its id and number.
///
/// # Errors
///
/// Returns an error when the order does not exist, or a validation error
/// when the edited order names a device that does not exist.
pub async fn edit_order<R, F>(repo: &Repository<R>, order_id: &str, edit: F) -> Result<ServiceOrder>
where
    R: RemoteStore,
    F: FnOnce(&mut ServiceOrder),
{
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    edit(&mut order);
    order.id = order_id.to_string();
    let equipment = EquipmentChoice::Existing(order.equipment_id.clone());
    save_order(repo, order, equipment).await
}

/// Finalise and deliver: status Entregue, payment Pago.
///
/// # Errors
///
/// Returns an error when the order does not exist or the local store fails.
pub async fn close_order<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    payment_method: Option<String>,
) -> Result<ServiceOrder> {
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    order.status = OrderStatus::Delivered;
    order.payment_status = PaymentStatus::Paid;
    if payment_method.is_some() {
        order.payment_method = payment_method;
    }
    let order = commit(repo, order).await?;
    info!(order = order.order_number, "order closed");
    Ok(order)
}

/// Add a product line at the current price, merging with an existing line
/// for the same product.
///
/// # Errors
///
/// Returns a validation error for a zero quantity, or an error when the order
/// or product does not exist.
pub async fn add_item<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    product_id: &str,
    quantity: u32,
) -> Result<ServiceOrder> {
    if quantity == 0 {
        return Err(Error::validation("Quantidade deve ser maior que zero."));
    }
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    let product = repo.require::<Product>(product_id).await?;

    match order.items.iter_mut().find(|i| i.product_id == product.id) {
        Some(line) => {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| Error::validation("Quantidade excede o limite do item."))?;
        }
        None => order.items.push(LineItem {
            product_id: product.id.clone(),
            quantity,
            price_at_time: product.price,
            cost_at_time: product.cost,
        }),
    }
    commit(repo, order).await
}

/// Remove the product line at `index`.
///
/// # Errors
///
/// Returns a validation error for an index out of range.
pub async fn remove_item<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    index: usize,
) -> Result<ServiceOrder> {
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    if index >= order.items.len() {
        return Err(Error::validation(format!("item {index} não existe")));
    }
    order.items.remove(index);
    commit(repo, order).await
}

/// Record an inspection result for one of the configured checklist items.
///
/// # Errors
///
/// Returns a validation error for an item missing from the shop checklist,
/// or an error when the order does not exist.
pub async fn set_checklist<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    item: &str,
    passed: bool,
    observations: Option<String>,
) -> Result<ServiceOrder> {
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    let item = item.trim();
    if !item.is_empty() {
        let known = settings::checklist_items(repo).await?;
        if !known.iter().any(|k| k == item) {
            return Err(Error::validation(format!(
                "Item de checklist desconhecido: {item}"
            )));
        }
        order.checklist.insert(item.to_string(), passed);
    }
    if observations.is_some() {
        order.checklist_observations = observations;
    }
    commit(repo, order).await
}

/// Append an entry to the order's occurrence log.
///
/// # Errors
///
/// Returns a validation error for a blank description.
pub async fn add_occurrence<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    kind: OccurrenceKind,
    description: &str,
) -> Result<ServiceOrder> {
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::validation("Descreva a ocorrência."));
    }
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    order.occurrences.push(Occurrence {
        id: new_id(),
        description: description.to_string(),
        timestamp: Utc::now(),
        kind,
    });
    commit(repo, order).await
}

/// Attach an image file to an order as an inline data URL.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not an image.
pub async fn attach_photo<R: RemoteStore>(
    repo: &Repository<R>,
    order_id: &str,
    path: &Path,
) -> Result<ServiceOrder> {
    let data_url = photo_data_url(path)?;
    let mut order = repo.require::<ServiceOrder>(order_id).await?;
    order.photos.push(data_url);
    commit(repo, order).await
}

/// Read an image into a `data:<mime>;base64,...` URL.
///
/// # Errors
///
/// Returns a validation error for an unknown extension, or an I/O error.
pub fn photo_data_url(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => {
            return Err(Error::validation(format!(
                "formato de imagem não suportado: {}",
                path.display()
            )))
        }
    };
    let bytes = std::fs::read(path)?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
