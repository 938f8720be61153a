//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::model::{
    AccountStatus, AccountType, OccurrenceKind, OrderStatus, PaymentStatus, Priority,
};
use crate::settings::TermsKind;

fn parse_money(input: &str) -> Result<Decimal, String> {
    crate::money::parse_amount(input).map_err(|e| e.to_string())
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{input}', expected YYYY-MM-DD or DD/MM/YYYY"))
}

fn parse_cart_item(input: &str) -> Result<(String, u32), String> {
    match input.split_once(':') {
        None => Ok((input.to_string(), 1)),
        Some((id, qty)) => qty
            .parse::<u32>()
            .map(|qty| (id.to_string(), qty))
            .map_err(|_| format!("invalid quantity in '{input}'")),
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

/// Output format flag shared by listing commands.
#[derive(Debug, Clone, Copy, Args)]
pub struct FormatArg {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Customer fields. Unset fields keep their current value on edit.
#[derive(Debug, Clone, Default, Args)]
pub struct CustomerFields {
    /// Phone / WhatsApp number
    #[arg(long)]
    pub phone: Option<String>,
    /// E-mail address
    #[arg(long)]
    pub email: Option<String>,
    /// CPF or CNPJ
    #[arg(long)]
    pub document: Option<String>,
    /// Postal code (CEP); fills the address when none is given
    #[arg(long)]
    pub zip: Option<String>,
    /// Street address
    #[arg(long)]
    pub address: Option<String>,
}

/// Supplier fields.
#[derive(Debug, Clone, Default, Args)]
pub struct SupplierFields {
    /// Contact person
    #[arg(long)]
    pub contact: Option<String>,
    /// Phone / WhatsApp number
    #[arg(long)]
    pub phone: Option<String>,
}

/// Product fields.
#[derive(Debug, Clone, Default, Args)]
pub struct ProductFields {
    /// Sale price (1234.56 or 1.234,56)
    #[arg(long, value_parser = parse_money)]
    pub price: Option<Decimal>,
    /// Acquisition cost
    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Decimal>,
    /// Units on hand
    #[arg(long, allow_negative_numbers = true)]
    pub stock: Option<i64>,
    /// Stock keeping unit
    #[arg(long)]
    pub sku: Option<String>,
    /// Category ("Serviços" marks a service)
    #[arg(long)]
    pub category: Option<String>,
}

/// Equipment fields.
#[derive(Debug, Clone, Default, Args)]
pub struct EquipmentFields {
    /// Device type (Smartphone, Notebook, ...)
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// Serial number or IMEI
    #[arg(long)]
    pub serial: Option<String>,
}

macro_rules! record_command {
    ($(#[$meta:meta])* $name:ident, $add:ty, $edit:ty) => {
        $(#[$meta])*
        #[derive(Debug, Subcommand)]
        pub enum $name {
            /// Register a new record
            Add($add),
            /// Change an existing record
            Edit($edit),
            /// List all records
            List(FormatArg),
            /// Find records containing the text
            Search {
                /// Text to look for (case-insensitive)
                query: String,
                #[command(flatten)]
                format: FormatArg,
            },
            /// Show one record
            Show {
                /// Record id
                id: String,
                #[command(flatten)]
                format: FormatArg,
            },
            /// Delete a record
            Delete {
                /// Record id
                id: String,
            },
        }
    };
}

/// `customer add` arguments.
#[derive(Debug, Args)]
pub struct CustomerAdd {
    /// Full name
    pub name: String,
    /// Optional details
    #[command(flatten)]
    pub fields: CustomerFields,
}

/// `customer edit` arguments.
#[derive(Debug, Args)]
pub struct CustomerEdit {
    /// Customer id
    pub id: String,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// Optional details
    #[command(flatten)]
    pub fields: CustomerFields,
}

/// `supplier add` arguments.
#[derive(Debug, Args)]
pub struct SupplierAdd {
    /// Company name
    pub name: String,
    /// Optional details
    #[command(flatten)]
    pub fields: SupplierFields,
}

/// `supplier edit` arguments.
#[derive(Debug, Args)]
pub struct SupplierEdit {
    /// Supplier id
    pub id: String,
    /// New company name
    #[arg(long)]
    pub name: Option<String>,
    /// Optional details
    #[command(flatten)]
    pub fields: SupplierFields,
}

/// `product add` arguments.
#[derive(Debug, Args)]
pub struct ProductAdd {
    /// Display name
    pub name: String,
    /// Optional details
    #[command(flatten)]
    pub fields: ProductFields,
}

/// `product edit` arguments.
#[derive(Debug, Args)]
pub struct ProductEdit {
    /// Product id
    pub id: String,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// Optional details
    #[command(flatten)]
    pub fields: ProductFields,
}

/// `equipment add` arguments.
#[derive(Debug, Args)]
pub struct EquipmentAdd {
    /// Owner's customer id
    pub customer: String,
    /// Brand
    pub brand: String,
    /// Model
    pub model: String,
    /// Optional details
    #[command(flatten)]
    pub fields: EquipmentFields,
}

/// `equipment edit` arguments.
#[derive(Debug, Args)]
pub struct EquipmentEdit {
    /// Equipment id
    pub id: String,
    /// New brand
    #[arg(long)]
    pub brand: Option<String>,
    /// New model
    #[arg(long)]
    pub model: Option<String>,
    /// Optional details
    #[command(flatten)]
    pub fields: EquipmentFields,
}

record_command!(
    /// Customer commands.
    CustomerCommand,
    CustomerAdd,
    CustomerEdit
);
record_command!(
    /// Supplier commands.
    SupplierCommand,
    SupplierAdd,
    SupplierEdit
);
record_command!(
    /// Product commands.
    ProductCommand,
    ProductAdd,
    ProductEdit
);
record_command!(
    /// Equipment commands.
    EquipmentCommand,
    EquipmentAdd,
    EquipmentEdit
);

/// Order status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Aguardando Análise
    Entry,
    /// Em Orçamento
    Budget,
    /// Aprovado
    Approved,
    /// Em Reparo
    InRepair,
    /// Finalizado
    Finished,
    /// Entregue
    Delivered,
    /// Cancelado
    Cancelled,
    /// Garantia/Retorno
    Warranty,
}

impl From<StatusArg> for OrderStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Entry => Self::Entry,
            StatusArg::Budget => Self::Budget,
            StatusArg::Approved => Self::Approved,
            StatusArg::InRepair => Self::InRepair,
            StatusArg::Finished => Self::Finished,
            StatusArg::Delivered => Self::Delivered,
            StatusArg::Cancelled => Self::Cancelled,
            StatusArg::Warranty => Self::Warranty,
        }
    }
}

/// Order priority argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Baixa
    Low,
    /// Média
    Medium,
    /// Alta
    High,
    /// Urgente
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

/// Payment status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaymentArg {
    /// Pendente
    Pending,
    /// Parcial
    Partial,
    /// Pago
    Paid,
}

impl From<PaymentArg> for PaymentStatus {
    fn from(arg: PaymentArg) -> Self {
        match arg {
            PaymentArg::Pending => Self::Pending,
            PaymentArg::Partial => Self::Partial,
            PaymentArg::Paid => Self::Paid,
        }
    }
}

/// Occurrence kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OccurrenceArg {
    /// Informação
    #[default]
    Info,
    /// Alerta
    Alert,
    /// Problema
    Problem,
}

impl From<OccurrenceArg> for OccurrenceKind {
    fn from(arg: OccurrenceArg) -> Self {
        match arg {
            OccurrenceArg::Info => Self::Info,
            OccurrenceArg::Alert => Self::Alert,
            OccurrenceArg::Problem => Self::Problem,
        }
    }
}

/// `order new` arguments.
#[derive(Debug, Args)]
pub struct OrderNew {
    /// Customer id
    pub customer: String,

    /// Existing equipment id
    #[arg(short, long, conflicts_with_all = ["brand", "model"])]
    pub equipment: Option<String>,

    /// Brand of a device registered with the order
    #[arg(long)]
    pub brand: Option<String>,

    /// Model of a device registered with the order
    #[arg(long)]
    pub model: Option<String>,

    /// Optional details

    #[command(flatten)]
    pub device: EquipmentFields,

    /// Reported problem
    #[arg(short, long)]
    pub problem: Option<String>,

    /// Accessories left with the device
    #[arg(long)]
    pub accessories: Option<String>,

    /// Labor charged
    #[arg(long, value_parser = parse_money)]
    pub labor: Option<Decimal>,

    /// Labor cost to the shop
    #[arg(long, value_parser = parse_money)]
    pub labor_cost_base: Option<Decimal>,

    /// Diagnosis fee
    #[arg(long, value_parser = parse_money)]
    pub diagnosis: Option<Decimal>,

    /// Assigned technician
    #[arg(long)]
    pub technician: Option<String>,

    /// Priority
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Warranty days (defaults to the configured value)
    #[arg(long)]
    pub warranty_days: Option<u32>,

    /// Initial status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,
}

/// `order edit` arguments. Unset fields keep their current value.
#[derive(Debug, Args)]
pub struct OrderEdit {
    /// Order id
    pub id: String,

    /// Move the order to another device of the same customer
    #[arg(short, long)]
    pub equipment: Option<String>,

    /// Reported problem
    #[arg(short, long)]
    pub problem: Option<String>,

    /// Technical report
    #[arg(short, long)]
    pub report: Option<String>,

    /// Accessories left with the device
    #[arg(long)]
    pub accessories: Option<String>,

    /// Labor charged
    #[arg(long, value_parser = parse_money)]
    pub labor: Option<Decimal>,

    /// Labor cost to the shop
    #[arg(long, value_parser = parse_money)]
    pub labor_cost_base: Option<Decimal>,

    /// Diagnosis fee
    #[arg(long, value_parser = parse_money)]
    pub diagnosis: Option<Decimal>,

    /// Assigned technician
    #[arg(long)]
    pub technician: Option<String>,

    /// Priority
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Warranty days
    #[arg(long)]
    pub warranty_days: Option<u32>,

    /// Status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Payment status
    #[arg(long, value_enum)]
    pub payment: Option<PaymentArg>,

    /// Payment method (Dinheiro, Cartão, Pix)
    #[arg(short, long)]
    pub method: Option<String>,
}

/// Line item commands.
#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Add a product or service to an order
    Add {
        /// Order id
        order: String,
        /// Product id
        product: String,
        /// Quantity
        #[arg(short = 'n', long, default_value = "1")]
        quantity: u32,
    },
    /// Remove a line by position (as shown by `order show`)
    Remove {
        /// Order id
        order: String,
        /// Zero-based line index
        index: usize,
    },
}

/// Service order commands.
#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// Open a new service order
    New(OrderNew),

    /// Change fields of an existing order
    Edit(OrderEdit),

    /// List orders, newest first
    List {
        /// Only orders in this status
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
        /// Order number or customer name contains
        #[arg(long)]
        query: Option<String>,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Show one order
    Show {
        /// Order id
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },

    /// Change an order's status
    Status {
        /// Order id
        id: String,
        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Add or remove line items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Finalise and deliver: status Entregue, payment Pago
    Close {
        /// Order id
        id: String,
        /// Payment method (Dinheiro, Cartão, Pix)
        #[arg(short, long)]
        method: Option<String>,
    },

    /// Append to the occurrence log
    Occurrence {
        /// Order id
        id: String,
        /// What happened
        description: String,
        /// Kind of occurrence
        #[arg(short, long, value_enum, default_value = "info")]
        kind: OccurrenceArg,
    },

    /// Attach a photo
    Photo {
        /// Order id
        id: String,
        /// Image file (jpg, png, webp, gif, bmp)
        path: PathBuf,
    },

    /// Render the printable document
    Print {
        /// Order id
        id: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a WhatsApp status message link
    Notify {
        /// Order id
        id: String,
    },

    /// Record an inspection result
    Checklist {
        /// Order id
        id: String,
        /// Inspection item
        item: String,
        /// Mark the item as failed
        #[arg(long)]
        fail: bool,
        /// Free-text observations
        #[arg(long)]
        observations: Option<String>,
    },

    /// Delete an order
    Delete {
        /// Order id
        id: String,
    },
}

/// Counter sale commands.
#[derive(Debug, Subcommand)]
pub enum SaleCommand {
    /// Sell products over the counter
    New {
        /// Products as `ID` or `ID:QTY` (repeatable)
        #[arg(short, long = "item", value_parser = parse_cart_item, required = true)]
        items: Vec<(String, u32)>,
        /// Payment method (Dinheiro, Cartão, Pix)
        #[arg(short, long)]
        method: Option<String>,
        /// Customer id
        #[arg(long)]
        customer: Option<String>,
    },
    /// List sales, newest first
    List(FormatArg),
    /// List sellable products
    Catalogue {
        /// Name contains
        #[arg(default_value = "")]
        query: String,
        #[command(flatten)]
        format: FormatArg,
    },
}

/// Account type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccountTypeArg {
    /// Conta a pagar
    Payable,
    /// Conta a receber
    Receivable,
}

impl From<AccountTypeArg> for AccountType {
    fn from(arg: AccountTypeArg) -> Self {
        match arg {
            AccountTypeArg::Payable => Self::Payable,
            AccountTypeArg::Receivable => Self::Receivable,
        }
    }
}

/// Account status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccountStatusArg {
    /// Pendente
    Pending,
    /// Pago
    Paid,
}

impl From<AccountStatusArg> for AccountStatus {
    fn from(arg: AccountStatusArg) -> Self {
        match arg {
            AccountStatusArg::Pending => Self::Pending,
            AccountStatusArg::Paid => Self::Paid,
        }
    }
}

/// Account filter flags.
#[derive(Debug, Clone, Copy, Args)]
pub struct AccountFilterArgs {
    /// Only this type
    #[arg(short = 't', long = "type", value_enum)]
    pub kind: Option<AccountTypeArg>,
    /// Only this status
    #[arg(short, long, value_enum)]
    pub status: Option<AccountStatusArg>,
}

/// Financial account commands.
#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Register a payable or receivable
    Add {
        /// Description
        description: String,
        /// Amount
        #[arg(value_parser = parse_money)]
        amount: Decimal,
        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(value_parser = parse_date)]
        due: NaiveDate,
        /// Type
        #[arg(short = 't', long = "type", value_enum, default_value = "payable")]
        kind: AccountTypeArg,
        /// Category
        #[arg(long)]
        category: Option<String>,
        /// Related order or sale id
        #[arg(long)]
        related: Option<String>,
    },
    /// Change fields of an account. Unset fields keep their current value
    Edit {
        /// Account id
        id: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Amount
        #[arg(short, long, value_parser = parse_money)]
        amount: Option<Decimal>,
        /// Due date (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// Type
        #[arg(short = 't', long = "type", value_enum)]
        kind: Option<AccountTypeArg>,
        /// Status
        #[arg(short, long, value_enum)]
        status: Option<AccountStatusArg>,
        /// Category
        #[arg(long)]
        category: Option<String>,
        /// Related order or sale id
        #[arg(long)]
        related: Option<String>,
    },
    /// List accounts, soonest due first
    List {
        #[command(flatten)]
        filter: AccountFilterArgs,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Flip between pending and paid
    Toggle {
        /// Account id
        id: String,
    },
    /// Delete an account
    Delete {
        /// Account id
        id: String,
    },
    /// Pending totals
    Summary {
        #[command(flatten)]
        filter: AccountFilterArgs,
        #[command(flatten)]
        format: FormatArg,
    },
}

/// Report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Revenue for a month
    Finance {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
        /// Cover all months
        #[arg(long, conflicts_with = "month")]
        all: bool,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Shop overview
    Dashboard(FormatArg),
}

/// Terms document argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TermsArg {
    /// Intake receipt
    Entry,
    /// Quote
    Budget,
    /// Delivery and warranty
    Exit,
}

impl From<TermsArg> for TermsKind {
    fn from(arg: TermsArg) -> Self {
        match arg {
            TermsArg::Entry => Self::Entry,
            TermsArg::Budget => Self::Budget,
            TermsArg::Exit => Self::Exit,
        }
    }
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show all settings
    Show(FormatArg),
    /// Change the shop identity
    Business {
        /// Shop name
        #[arg(long)]
        name: Option<String>,
        /// CNPJ or CPF
        #[arg(long)]
        cnpj: Option<String>,
        /// Phone / WhatsApp
        #[arg(long)]
        phone: Option<String>,
        /// Address
        #[arg(long)]
        address: Option<String>,
        /// Logo URL
        #[arg(long)]
        logo_url: Option<String>,
    },
    /// Add an inspection item
    ChecklistAdd {
        /// Item name
        item: String,
    },
    /// Remove an inspection item by position
    ChecklistRemove {
        /// Zero-based index
        index: usize,
    },
    /// Show or change document terms
    Terms {
        /// Which document
        #[arg(value_enum)]
        kind: TermsArg,
        /// New text (shows the current text when omitted)
        text: Option<String>,
    },
    /// Show or change the default warranty
    Warranty {
        /// Days (shows the current value when omitted)
        days: Option<u32>,
    },
}

/// Database and sync commands.
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Check the cloud database connection
    Test,
    /// Create or upgrade the cloud tables
    Init,
    /// Replay writes that failed to reach the cloud
    Sync,
    /// Upload every local record and setting to the cloud
    Push,
    /// Show local database statistics
    Status(FormatArg),
}

/// Assistant commands.
#[derive(Debug, Subcommand)]
pub enum AssistCommand {
    /// Suggest a technical report for a problem
    Report {
        /// Problem description, or an order id with --order
        problem: String,
        /// Treat the argument as an order id and use its problem
        #[arg(long)]
        order: bool,
    },
    /// Business tips from the dashboard figures
    Insights,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("1.234,56").unwrap(), Decimal::new(123_456, 2));
        assert!(parse_money("abc").is_err());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(parse_date("2024-06-30").unwrap(), expected);
        assert_eq!(parse_date("30/06/2024").unwrap(), expected);
        assert!(parse_date("junho").is_err());
    }

    #[test]
    fn test_parse_cart_item() {
        assert_eq!(parse_cart_item("p1").unwrap(), ("p1".to_string(), 1));
        assert_eq!(parse_cart_item("p1:3").unwrap(), ("p1".to_string(), 3));
        assert!(parse_cart_item("p1:x").is_err());
    }

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(OrderStatus::from(StatusArg::InRepair), OrderStatus::InRepair);
        assert_eq!(OrderStatus::from(StatusArg::Delivered), OrderStatus::Delivered);
    }

    #[test]
    fn test_account_arg_conversion() {
        assert_eq!(AccountType::from(AccountTypeArg::Receivable), AccountType::Receivable);
        assert_eq!(AccountStatus::from(AccountStatusArg::Paid), AccountStatus::Paid);
    }

    #[test]
    fn test_terms_arg_conversion() {
        assert_eq!(TermsKind::from(TermsArg::Budget), TermsKind::Budget);
    }
}
