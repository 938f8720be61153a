//! Printable service order document.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{BusinessInfo, Customer, Equipment, OrderStatus, Product, ServiceOrder};
use crate::money::format_brl;
use crate::remote::RemoteStore;
use crate::repository::Repository;
use crate::settings::{self, TermsKind};

const STYLE: &str = "\
@page { size: A4; margin: 10mm; }
body { font-family: sans-serif; color: #000; font-size: 10px; margin: 0; line-height: 1.2; }
.container { max-width: 190mm; margin: 0 auto; }
.header { display: flex; justify-content: space-between; border-bottom: 2px solid #000; padding-bottom: 10px; margin-bottom: 15px; }
.biz h1 { margin: 0; font-size: 20px; font-weight: 900; }
.biz p { margin: 2px 0; color: #444; font-size: 9px; }
.os { text-align: right; }
.os .number { font-size: 28px; font-weight: 900; margin: 0; }
.section { border: 1px solid #ddd; border-radius: 4px; padding: 8px; margin-bottom: 10px; }
.label { font-size: 7px; font-weight: 900; color: #555; text-transform: uppercase; display: block; border-bottom: 1px solid #eee; margin-bottom: 5px; }
.row { display: grid; grid-template-columns: 1fr 1fr; gap: 10px; }
.field strong { display: block; font-size: 7px; color: #777; text-transform: uppercase; }
.field span { font-size: 10px; font-weight: bold; display: block; }
table { width: 100%; border-collapse: collapse; }
th { text-align: left; font-size: 8px; text-transform: uppercase; border-bottom: 1.5px solid #000; }
td { border-bottom: 1px solid #eee; padding: 4px 0; font-size: 9px; }
.num { text-align: right; }
.total { display: flex; justify-content: flex-end; gap: 20px; border-top: 2px solid #000; margin-top: 10px; font-size: 18px; font-weight: 900; }
.terms { font-size: 7.5px; border: 1px solid #eee; padding: 8px; margin-top: 15px; }
.signatures { display: flex; justify-content: space-between; margin-top: 40px; }
.sig { border-top: 1.5px solid #000; width: 45%; text-align: center; font-size: 8px; font-weight: 900; text-transform: uppercase; }
";

/// Escape text for interpolation into HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Which terms go on the document for an order in `status`.
#[must_use]
pub fn terms_kind_for(status: OrderStatus) -> TermsKind {
    match status {
        OrderStatus::Budget => TermsKind::Budget,
        OrderStatus::Finished | OrderStatus::Delivered => TermsKind::Exit,
        _ => TermsKind::Entry,
    }
}

/// Everything printed alongside the order itself.
#[derive(Debug, Clone, Copy)]
pub struct PrintContext<'a> {
    /// Shop header.
    pub business: &'a BusinessInfo,
    /// Order owner, when still on file.
    pub customer: Option<&'a Customer>,
    /// Device, when still on file.
    pub equipment: Option<&'a Equipment>,
    /// Catalogue used to name the line items.
    pub products: &'a [Product],
    /// Terms text for the order's status.
    pub terms: &'a str,
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<div class=\"field\"><strong>{label}</strong><span>{}</span></div>",
        escape_html(value)
    );
}

fn line(out: &mut String, description: &str, unit: Decimal, total: Decimal) {
    let _ = write!(
        out,
        "<tr><td>{}</td><td class=\"num\">R$ {}</td><td class=\"num\">R$ {}</td></tr>",
        escape_html(description),
        format_brl(unit),
        format_brl(total)
    );
}

/// Render a self-contained HTML document for an order.
#[must_use]
pub fn render_order(order: &ServiceOrder, ctx: &PrintContext<'_>) -> String {
    let biz = ctx.business;
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>ORDEM DE SERVIÇO #{number}</title>\n<style>\n{STYLE}</style>\n</head>\n\
         <body onload=\"window.print()\">\n<div class=\"container\">\n",
        number = order.order_number
    );

    let _ = write!(
        html,
        "<div class=\"header\"><div class=\"biz\"><h1>{}</h1>\
         <p>CNPJ/CPF: {} | Fone/WhatsApp: {}</p><p>{}</p></div>\
         <div class=\"os\"><p>ORDEM DE SERVIÇO</p><p class=\"number\">#{}</p><p>{}</p></div></div>\n",
        escape_html(&biz.name),
        escape_html(&biz.cnpj),
        escape_html(&biz.phone),
        escape_html(&biz.address),
        order.order_number,
        order.created_at.format("%d/%m/%Y %H:%M")
    );

    html.push_str("<div class=\"section\"><span class=\"label\">Dados do Cliente</span><div class=\"row\">");
    let (name, phone) = ctx
        .customer
        .map_or(("", ""), |c| (c.name.as_str(), c.phone.as_str()));
    field(&mut html, "Nome", or_placeholder(name, "---"));
    field(&mut html, "WhatsApp", or_placeholder(phone, "---"));
    html.push_str("</div></div>\n");

    html.push_str(
        "<div class=\"section\"><span class=\"label\">Dados do Equipamento</span><div class=\"row\">",
    );
    let device = ctx.equipment.map(Equipment::label).unwrap_or_default();
    let serial = ctx.equipment.map_or("", |e| e.serial_number.as_str());
    field(&mut html, "Marca / Modelo", or_placeholder(&device, "---"));
    field(&mut html, "Nº de Série", or_placeholder(serial, "N/A"));
    field(&mut html, "Acessórios", or_placeholder(&order.accessories, "NENHUM"));
    html.push_str("</div></div>\n");

    let _ = write!(
        html,
        "<div class=\"section\"><span class=\"label\">Defeito / Diagnóstico</span>\
         <div><strong>{}</strong></div></div>\n",
        escape_html(or_placeholder(&order.problem_description, "---"))
    );

    html.push_str(
        "<div class=\"section\"><span class=\"label\">Produtos e Serviços</span>\
         <table><thead><tr><th style=\"width: 60%\">Descrição</th>\
         <th class=\"num\">Valor Unit.</th><th class=\"num\">Total</th></tr></thead><tbody>",
    );
    if order.labor_cost > Decimal::ZERO {
        line(&mut html, "MÃO DE OBRA", order.labor_cost, order.labor_cost);
    }
    if order.diagnosis_fee > Decimal::ZERO {
        line(&mut html, "TAXA DE DIAGNÓSTICO", order.diagnosis_fee, order.diagnosis_fee);
    }
    for item in &order.items {
        let name = ctx
            .products
            .iter()
            .find(|p| p.id == item.product_id)
            .map_or("Item", |p| p.name.as_str());
        line(&mut html, name, item.price_at_time, item.subtotal());
    }
    let _ = write!(
        html,
        "</tbody></table><div class=\"total\"><span>VALOR TOTAL</span><span>R$ {}</span></div></div>\n",
        format_brl(order.total)
    );

    let _ = write!(
        html,
        "<div class=\"terms\"><strong>{}</strong><br>{}</div>\n\
         <div class=\"signatures\"><div class=\"sig\">Assinatura do Cliente</div>\
         <div class=\"sig\">Responsável</div></div>\n</div>\n</body>\n</html>\n",
        terms_kind_for(order.status).title(),
        escape_html(ctx.terms).replace('\n', "<br>")
    );

    html
}

/// Load an order with its customer, device, catalogue and terms, and render it.
///
/// # Errors
///
/// Returns an error when the order does not exist or the local store fails.
pub async fn order_document<R: RemoteStore>(repo: &Repository<R>, order_id: &str) -> Result<String> {
    let order = repo.require::<ServiceOrder>(order_id).await?;
    let business = settings::business_info(repo).await?;
    let customer = repo.get::<Customer>(&order.customer_id).await?;
    let equipment = repo.get::<Equipment>(&order.equipment_id).await?;
    let products = repo.list::<Product>().await?;
    let terms = settings::terms(repo, terms_kind_for(order.status)).await?;

    Ok(render_order(
        &order,
        &PrintContext {
            business: &business,
            customer: customer.as_ref(),
            equipment: equipment.as_ref(),
            products: &products,
            terms: &terms,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;

    fn sample_order() -> ServiceOrder {
        ServiceOrder {
            id: "o1".to_string(),
            order_number: 1042,
            problem_description: "Não liga <urgente>".to_string(),
            labor_cost: Decimal::new(80, 0),
            items: vec![LineItem {
                product_id: "p1".to_string(),
                quantity: 2,
                price_at_time: Decimal::new(1500, 2),
                cost_at_time: Decimal::ZERO,
            }],
            total: Decimal::new(110, 0),
            ..ServiceOrder::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_terms_kind_for_status() {
        assert_eq!(terms_kind_for(OrderStatus::Budget), TermsKind::Budget);
        assert_eq!(terms_kind_for(OrderStatus::Delivered), TermsKind::Exit);
        assert_eq!(terms_kind_for(OrderStatus::Finished), TermsKind::Exit);
        assert_eq!(terms_kind_for(OrderStatus::InRepair), TermsKind::Entry);
    }

    #[test]
    fn test_render_order() {
        let business = BusinessInfo::default();
        let customer = Customer::new("Ana & Filhos", "11999990000");
        let products = vec![Product {
            id: "p1".to_string(),
            name: "Película".to_string(),
            ..Product::default()
        }];
        let order = sample_order();
        let html = render_order(
            &order,
            &PrintContext {
                business: &business,
                customer: Some(&customer),
                equipment: None,
                products: &products,
                terms: "ANÁLISE EM 5 DIAS ÚTEIS.",
            },
        );

        assert!(html.contains("<title>ORDEM DE SERVIÇO #1042</title>"));
        assert!(html.contains("Ana &amp; Filhos"));
        assert!(html.contains("Não liga &lt;urgente&gt;"));
        assert!(html.contains("MÃO DE OBRA"));
        assert!(!html.contains("TAXA DE DIAGNÓSTICO"));
        assert!(html.contains("<td>Película</td><td class=\"num\">R$ 15,00</td><td class=\"num\">R$ 30,00</td>"));
        assert!(html.contains("R$ 110,00"));
        assert!(html.contains("TERMOS DE ENTRADA:"));
        assert!(html.contains("NENHUM"));
        assert!(html.contains("N/A"));
        assert!(html.contains("Assinatura do Cliente"));
    }

    #[test]
    fn test_unknown_product_prints_as_item() {
        let business = BusinessInfo::default();
        let html = render_order(
            &sample_order(),
            &PrintContext {
                business: &business,
                customer: None,
                equipment: None,
                products: &[],
                terms: "",
            },
        );
        assert!(html.contains("<td>Item</td>"));
        assert!(html.contains("<span>---</span>"));
    }

    #[tokio::test]
    async fn test_order_document_uses_status_terms() {
        use crate::remote::MemoryRemote;
        use crate::storage::Storage;

        let repo: Repository<MemoryRemote> = Repository::local(Storage::open_in_memory().unwrap());
        let mut order = sample_order();
        order.status = OrderStatus::Budget;
        repo.save(&order).await.unwrap();

        let html = order_document(&repo, "o1").await.unwrap();
        assert!(html.contains("TERMOS DE ORÇAMENTO:"));
        assert!(html.contains("ORÇAMENTO VÁLIDO POR 7 DIAS."));
        assert!(order_document(&repo, "missing").await.unwrap_err().is_not_found());
    }
}
