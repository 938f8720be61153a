//! Command-line interface for fixos.
//!
//! This module provides the CLI structure and command definitions for the
//! `fixos` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AccountCommand, AccountFilterArgs, AccountStatusArg, AccountTypeArg, AssistCommand,
    ConfigCommand, CustomerAdd, CustomerCommand, CustomerEdit, CustomerFields, DbCommand,
    EquipmentAdd, EquipmentCommand, EquipmentEdit, EquipmentFields, FormatArg, ItemCommand,
    OccurrenceArg, OrderCommand, OrderEdit, OrderNew, OutputFormat, PaymentArg, PriorityArg,
    ProductAdd, ProductCommand, ProductEdit, ProductFields, ReportCommand, SaleCommand,
    SettingsCommand, StatusArg, SupplierAdd, SupplierCommand, SupplierEdit, SupplierFields,
    TermsArg,
};

/// fixos - Repair-shop management
///
/// Customers, equipment, service orders, inventory, counter sales and
/// accounts, stored locally and optionally mirrored to a cloud database.
#[derive(Debug, Parser)]
#[command(name = "fixos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage customers
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// Manage suppliers
    #[command(subcommand)]
    Supplier(SupplierCommand),

    /// Manage parts and services
    #[command(subcommand)]
    Product(ProductCommand),

    /// Manage customer devices
    #[command(subcommand)]
    Equipment(EquipmentCommand),

    /// Manage service orders
    #[command(subcommand)]
    Order(OrderCommand),

    /// Counter sales
    #[command(subcommand)]
    Sale(SaleCommand),

    /// Accounts payable and receivable
    #[command(subcommand)]
    Account(AccountCommand),

    /// Revenue reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// Shop settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Database and cloud sync
    #[command(subcommand)]
    Db(DbCommand),

    /// Look up an address by postal code (CEP)
    Cep {
        /// Postal code, with or without punctuation
        cep: String,
    },

    /// Generated suggestions
    #[command(subcommand)]
    Assist(AssistCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
