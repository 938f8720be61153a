//! `fixos` - CLI for the fixos repair-shop manager
//!
//! This binary provides the command-line interface for managing shop records,
//! printing orders and keeping the optional cloud mirror in sync.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use fixos::accounts::{self, AccountFilter};
use fixos::assistant::Assistant;
use fixos::cli::{
    AccountCommand, AccountFilterArgs, AssistCommand, Cli, Command, ConfigCommand,
    CustomerCommand, CustomerFields, DbCommand, EquipmentCommand, EquipmentFields, ItemCommand,
    OrderCommand, OrderEdit, OrderNew, OutputFormat, ProductCommand, ProductFields, ReportCommand,
    SaleCommand, SettingsCommand, SupplierCommand, SupplierFields,
};
use fixos::lookup::PostalLookup;
use fixos::model::{self, BusinessInfo, Entity};
use fixos::money::format_currency;
use fixos::orders::{self, EquipmentChoice};
use fixos::reports;
use fixos::sales::{self, Cart};
use fixos::settings::{self, TermsKind};
use fixos::{
    init_logging, notify, print, Config, Customer, Equipment, Error, FinancialAccount, OrderStatus,
    PgRemote, Product, Repository, Sale, ServiceOrder, Storage, Supplier, SyncReport,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation must work on files that would fail to load
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        validate_config(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Cep { cep } => handle_cep(&config, &cep).await,
        command => {
            let repo = open_repository(&config)?;
            dispatch(&repo, &config, command).await
        }
    }
}

fn open_repository(config: &Config) -> CliResult<Repository> {
    let storage = Storage::open(config.database_path())?;
    let remote = PgRemote::from_config(&config.cloud)?;
    if remote.is_some() {
        info!("cloud mode enabled");
    }
    Ok(Repository::new(storage, remote))
}

async fn dispatch(repo: &Repository, config: &Config, command: Command) -> CliResult {
    match command {
        Command::Customer(cmd) => handle_customer(repo, config, cmd).await,
        Command::Supplier(cmd) => handle_supplier(repo, cmd).await,
        Command::Product(cmd) => handle_product(repo, cmd).await,
        Command::Equipment(cmd) => handle_equipment(repo, cmd).await,
        Command::Order(cmd) => handle_order(repo, config, cmd).await,
        Command::Sale(cmd) => handle_sale(repo, cmd).await,
        Command::Account(cmd) => handle_account(repo, cmd).await,
        Command::Report(cmd) => handle_report(repo, config, cmd).await,
        Command::Settings(cmd) => handle_settings(repo, cmd).await,
        Command::Db(cmd) => handle_db(repo, config, cmd).await,
        Command::Assist(cmd) => handle_assist(repo, config, cmd).await,
        Command::Config(_) | Command::Cep { .. } => Ok(()),
    }
}

// === Output ===

/// One-line plain rendering of a record.
trait Row {
    fn row(&self) -> String;
}

impl Row for Customer {
    fn row(&self) -> String {
        format!("{}  {}  {}", self.id, self.name, self.phone)
    }
}

impl Row for Supplier {
    fn row(&self) -> String {
        format!("{}  {}  {}  {}", self.id, self.name, self.contact, self.phone)
    }
}

impl Row for Product {
    fn row(&self) -> String {
        format!(
            "{}  {}  [{}]  {}  estoque: {}",
            self.id,
            self.name,
            self.category,
            format_currency(self.price),
            self.stock_label()
        )
    }
}

impl Row for Equipment {
    fn row(&self) -> String {
        format!(
            "{}  {} {}  S/N: {}  cliente: {}",
            self.id,
            self.kind,
            self.label(),
            if self.serial_number.is_empty() { "N/A" } else { self.serial_number.as_str() },
            self.customer_id
        )
    }
}

impl Row for Sale {
    fn row(&self) -> String {
        format!(
            "{}  {}  {}  {}  {} item(s)",
            self.id,
            self.created_at.format("%d/%m/%Y %H:%M"),
            format_currency(self.total),
            self.payment_method,
            self.items.len()
        )
    }
}

impl Row for FinancialAccount {
    fn row(&self) -> String {
        format!(
            "{}  {}  {}  {}  {}  {}  {}",
            self.id,
            self.due_date.format("%d/%m/%Y"),
            self.kind,
            accounts::status_label(self),
            format_currency(self.amount),
            self.category,
            self.description
        )
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_list<T: Row + Serialize>(records: &[T], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => print_json(records)?,
        OutputFormat::Plain => {
            if records.is_empty() {
                println!("Nenhum registro encontrado.");
            }
            for record in records {
                println!("{}", record.row());
            }
        }
    }
    Ok(())
}

fn print_one<T: Row + Serialize>(record: &T, format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Plain => {
            println!("{}", record.row());
            Ok(())
        }
    }
}

// === Shared record commands ===

async fn list_records<T: Entity + Row>(repo: &Repository, format: OutputFormat) -> CliResult {
    print_list(&repo.list::<T>().await?, format)
}

async fn search_records<T: Entity + Row>(
    repo: &Repository,
    query: &str,
    format: OutputFormat,
) -> CliResult {
    print_list(&model::search(repo.list::<T>().await?, query), format)
}

async fn show_record<T: Entity + Row>(repo: &Repository, id: &str, format: OutputFormat) -> CliResult {
    print_one(&repo.require::<T>(id).await?, format)
}

async fn delete_record<T: Entity>(repo: &Repository, id: &str) -> CliResult {
    if !repo.delete::<T>(id).await? {
        return Err(Error::not_found(T::KIND, id).into());
    }
    println!("Excluído: {} {id}", T::KIND);
    Ok(())
}

fn saved<T: Entity>(record: &T) {
    println!("Salvo: {} {}", T::KIND, record.id());
}

// === Customers ===

async fn apply_customer(config: &Config, customer: &mut Customer, fields: CustomerFields) {
    if let Some(phone) = fields.phone {
        customer.phone = phone;
    }
    if let Some(email) = fields.email {
        customer.email = email;
    }
    if let Some(document) = fields.document {
        customer.document = document;
    }
    if let Some(address) = fields.address {
        customer.address = address;
    }
    if let Some(zip) = fields.zip {
        if customer.address.trim().is_empty() {
            if let Ok(lookup) = PostalLookup::from_config(&config.lookup) {
                if let Some(address) = lookup.address(&zip).await {
                    customer.address = address;
                }
            }
        }
        customer.zip_code = Some(zip);
    }
}

async fn handle_customer(repo: &Repository, config: &Config, cmd: CustomerCommand) -> CliResult {
    match cmd {
        CustomerCommand::Add(add) => {
            let mut customer = Customer::new(add.name, "");
            apply_customer(config, &mut customer, add.fields).await;
            customer.validate()?;
            repo.save(&customer).await?;
            saved(&customer);
        }
        CustomerCommand::Edit(edit) => {
            let mut customer = repo.require::<Customer>(&edit.id).await?;
            if let Some(name) = edit.name {
                customer.name = name;
            }
            apply_customer(config, &mut customer, edit.fields).await;
            customer.validate()?;
            repo.save(&customer).await?;
            saved(&customer);
        }
        CustomerCommand::List(f) => list_records::<Customer>(repo, f.format).await?,
        CustomerCommand::Search { query, format } => {
            search_records::<Customer>(repo, &query, format.format).await?;
        }
        CustomerCommand::Show { id, format } => {
            show_record::<Customer>(repo, &id, format.format).await?;
        }
        CustomerCommand::Delete { id } => delete_record::<Customer>(repo, &id).await?,
    }
    Ok(())
}

// === Suppliers ===

fn apply_supplier(supplier: &mut Supplier, fields: SupplierFields) {
    if let Some(contact) = fields.contact {
        supplier.contact = contact;
    }
    if let Some(phone) = fields.phone {
        supplier.phone = phone;
    }
}

async fn handle_supplier(repo: &Repository, cmd: SupplierCommand) -> CliResult {
    match cmd {
        SupplierCommand::Add(add) => {
            let mut supplier = Supplier::new(add.name);
            apply_supplier(&mut supplier, add.fields);
            supplier.validate()?;
            repo.save(&supplier).await?;
            saved(&supplier);
        }
        SupplierCommand::Edit(edit) => {
            let mut supplier = repo.require::<Supplier>(&edit.id).await?;
            if let Some(name) = edit.name {
                supplier.name = name;
            }
            apply_supplier(&mut supplier, edit.fields);
            supplier.validate()?;
            repo.save(&supplier).await?;
            saved(&supplier);
        }
        SupplierCommand::List(f) => list_records::<Supplier>(repo, f.format).await?,
        SupplierCommand::Search { query, format } => {
            search_records::<Supplier>(repo, &query, format.format).await?;
        }
        SupplierCommand::Show { id, format } => {
            show_record::<Supplier>(repo, &id, format.format).await?;
        }
        SupplierCommand::Delete { id } => delete_record::<Supplier>(repo, &id).await?,
    }
    Ok(())
}

// === Products ===

fn apply_product(product: &mut Product, fields: ProductFields) {
    if let Some(price) = fields.price {
        product.price = price;
    }
    if let Some(cost) = fields.cost {
        product.cost = cost;
    }
    if let Some(stock) = fields.stock {
        product.stock = stock;
    }
    if let Some(sku) = fields.sku {
        product.sku = sku;
    }
    if let Some(category) = fields.category {
        product.category = category;
    }
}

async fn handle_product(repo: &Repository, cmd: ProductCommand) -> CliResult {
    match cmd {
        ProductCommand::Add(add) => {
            let mut product = Product::new(add.name, Decimal::ZERO);
            apply_product(&mut product, add.fields);
            product.validate()?;
            repo.save(&product).await?;
            saved(&product);
        }
        ProductCommand::Edit(edit) => {
            let mut product = repo.require::<Product>(&edit.id).await?;
            if let Some(name) = edit.name {
                product.name = name;
            }
            apply_product(&mut product, edit.fields);
            product.validate()?;
            repo.save(&product).await?;
            saved(&product);
        }
        ProductCommand::List(f) => list_records::<Product>(repo, f.format).await?,
        ProductCommand::Search { query, format } => {
            search_records::<Product>(repo, &query, format.format).await?;
        }
        ProductCommand::Show { id, format } => {
            show_record::<Product>(repo, &id, format.format).await?;
        }
        ProductCommand::Delete { id } => delete_record::<Product>(repo, &id).await?,
    }
    Ok(())
}

// === Equipment ===

fn apply_equipment(device: &mut Equipment, fields: EquipmentFields) {
    if let Some(kind) = fields.kind {
        device.kind = kind;
    }
    if let Some(serial) = fields.serial {
        device.serial_number = serial;
    }
}

async fn handle_equipment(repo: &Repository, cmd: EquipmentCommand) -> CliResult {
    match cmd {
        EquipmentCommand::Add(add) => {
            repo.require::<Customer>(&add.customer).await?;
            let mut device = Equipment::new(add.customer, add.brand, add.model);
            apply_equipment(&mut device, add.fields);
            device.validate()?;
            repo.save(&device).await?;
            saved(&device);
        }
        EquipmentCommand::Edit(edit) => {
            let mut device = repo.require::<Equipment>(&edit.id).await?;
            if let Some(brand) = edit.brand {
                device.brand = brand;
            }
            if let Some(model) = edit.model {
                device.model = model;
            }
            apply_equipment(&mut device, edit.fields);
            device.validate()?;
            repo.save(&device).await?;
            saved(&device);
        }
        EquipmentCommand::List(f) => list_records::<Equipment>(repo, f.format).await?,
        EquipmentCommand::Search { query, format } => {
            // A customer id lists that customer's devices.
            let devices = orders::customer_equipment(repo, &query).await?;
            if devices.is_empty() {
                search_records::<Equipment>(repo, &query, format.format).await?;
            } else {
                print_list(&devices, format.format)?;
            }
        }
        EquipmentCommand::Show { id, format } => {
            show_record::<Equipment>(repo, &id, format.format).await?;
        }
        EquipmentCommand::Delete { id } => delete_record::<Equipment>(repo, &id).await?,
    }
    Ok(())
}

// === Orders ===

fn order_row(order: &ServiceOrder, customers: &[Customer]) -> String {
    let customer = customers
        .iter()
        .find(|c| c.id == order.customer_id)
        .map_or("---", |c| c.name.as_str());
    format!(
        "#{}  {}  {}  {}  {}  {}",
        order.order_number,
        order.created_at.format("%d/%m/%Y"),
        order.status,
        customer,
        format_currency(order.total),
        order.id
    )
}

fn print_order_details(order: &ServiceOrder, customer: Option<&Customer>, products: &[Product]) {
    println!("O.S. #{}  ({})", order.order_number, order.id);
    println!("Status:      {}  |  Pagamento: {}", order.status, order.payment_status);
    println!(
        "Cliente:     {}",
        customer.map_or("---".to_string(), |c| format!("{} ({})", c.name, c.phone))
    );
    println!("Equipamento: {}", order.equipment_id);
    println!("Criada:      {}", order.created_at.format("%d/%m/%Y %H:%M"));
    println!("Atualizada:  {}", order.updated_at.format("%d/%m/%Y %H:%M"));
    if !order.problem_description.is_empty() {
        println!("Defeito:     {}", order.problem_description);
    }
    if !order.technical_report.is_empty() {
        println!("Laudo:       {}", order.technical_report);
    }
    if let Some(technician) = &order.technician {
        println!("Técnico:     {technician}");
    }
    if let Some(priority) = order.priority {
        println!("Prioridade:  {priority}");
    }

    println!("Itens:");
    for (index, item) in order.items.iter().enumerate() {
        let name = products
            .iter()
            .find(|p| p.id == item.product_id)
            .map_or("Item", |p| p.name.as_str());
        println!(
            "  [{index}] {name} x{}  {}",
            item.quantity,
            format_currency(item.subtotal())
        );
    }
    println!("Mão de obra: {}", format_currency(order.labor_cost));
    println!("Diagnóstico: {}", format_currency(order.diagnosis_fee));
    println!("Total:       {}", format_currency(order.total));
    println!("Custo:       {}", format_currency(order.total_cost));

    if !order.checklist.is_empty() {
        println!("Checklist:");
        for (item, passed) in &order.checklist {
            println!("  [{}] {item}", if *passed { "x" } else { " " });
        }
    }
    if let Some(observations) = &order.checklist_observations {
        println!("Observações: {observations}");
    }
    match order.warranty_expiry_date {
        Some(expiry) => println!(
            "Garantia:    {} dias, até {}",
            order.warranty_days,
            expiry.format("%d/%m/%Y")
        ),
        None => println!("Garantia:    {} dias", order.warranty_days),
    }
    if !order.photos.is_empty() {
        println!("Fotos:       {}", order.photos.len());
    }
    for occurrence in &order.occurrences {
        println!(
            "  {} [{}] {}",
            occurrence.timestamp.format("%d/%m/%Y %H:%M"),
            occurrence.kind,
            occurrence.description
        );
    }
    println!("Histórico:");
    for entry in &order.history {
        println!(
            "  {}  {}  {}",
            entry.timestamp.format("%d/%m/%Y %H:%M"),
            entry.status,
            entry.note.as_deref().unwrap_or("")
        );
    }
}

async fn create_order(repo: &Repository, new: OrderNew) -> CliResult<ServiceOrder> {
    let mut order = orders::new_order(repo, &new.customer).await?;
    order.problem_description = new.problem.unwrap_or_default();
    order.accessories = new.accessories.unwrap_or_default();
    order.labor_cost = new.labor.unwrap_or_default();
    order.labor_cost_base = new.labor_cost_base;
    order.diagnosis_fee = new.diagnosis.unwrap_or_default();
    order.technician = new.technician;
    order.priority = new.priority.map(Into::into);
    if let Some(days) = new.warranty_days {
        order.warranty_days = days;
    }
    if let Some(status) = new.status {
        order.status = status.into();
    }

    let equipment = match (new.equipment, new.brand, new.model) {
        (Some(id), _, _) => EquipmentChoice::Existing(id),
        (None, None, None) => EquipmentChoice::Existing(String::new()),
        (None, brand, model) => {
            let mut device = Equipment::new(
                &new.customer,
                brand.unwrap_or_default(),
                model.unwrap_or_default(),
            );
            apply_equipment(&mut device, new.device);
            EquipmentChoice::New(device)
        }
    };

    Ok(orders::save_order(repo, order, equipment).await?)
}

async fn edit_order(repo: &Repository, edit: OrderEdit) -> CliResult<ServiceOrder> {
    let order = orders::edit_order(repo, &edit.id, |order| {
        if let Some(equipment) = edit.equipment {
            order.equipment_id = equipment;
        }
        if let Some(problem) = edit.problem {
            order.problem_description = problem;
        }
        if let Some(report) = edit.report {
            order.technical_report = report;
        }
        if let Some(accessories) = edit.accessories {
            order.accessories = accessories;
        }
        if let Some(labor) = edit.labor {
            order.labor_cost = labor;
        }
        if edit.labor_cost_base.is_some() {
            order.labor_cost_base = edit.labor_cost_base;
        }
        if let Some(diagnosis) = edit.diagnosis {
            order.diagnosis_fee = diagnosis;
        }
        if edit.technician.is_some() {
            order.technician = edit.technician;
        }
        if let Some(priority) = edit.priority {
            order.priority = Some(priority.into());
        }
        if let Some(days) = edit.warranty_days {
            order.warranty_days = days;
        }
        if let Some(status) = edit.status {
            order.status = status.into();
        }
        if let Some(payment) = edit.payment {
            order.payment_status = payment.into();
        }
        if edit.method.is_some() {
            order.payment_method = edit.method;
        }
    })
    .await?;
    Ok(order)
}

async fn handle_order(repo: &Repository, config: &Config, cmd: OrderCommand) -> CliResult {
    match cmd {
        OrderCommand::New(new) => {
            let order = create_order(repo, new).await?;
            println!("O.S. #{} aberta ({})", order.order_number, order.id);
        }
        OrderCommand::Edit(edit) => {
            let order = edit_order(repo, edit).await?;
            println!(
                "O.S. #{} atualizada: {} ({})",
                order.order_number,
                order.status,
                format_currency(order.total)
            );
        }
        OrderCommand::List { status, query, format } => {
            let customers = repo.list::<Customer>().await?;
            let mut list = repo.list::<ServiceOrder>().await?;
            if let Some(status) = status {
                let status: OrderStatus = status.into();
                list.retain(|o| o.status == status);
            }
            if let Some(query) = query {
                list = orders::search_orders(list, &customers, &query);
            }
            match format.format {
                OutputFormat::Json => print_json(&list)?,
                OutputFormat::Plain => {
                    if list.is_empty() {
                        println!("Nenhuma O.S. encontrada.");
                    }
                    for order in &list {
                        println!("{}", order_row(order, &customers));
                    }
                }
            }
        }
        OrderCommand::Show { id, format } => {
            let order = repo.require::<ServiceOrder>(&id).await?;
            match format.format {
                OutputFormat::Json => print_json(&order)?,
                OutputFormat::Plain => {
                    let customer = repo.get::<Customer>(&order.customer_id).await?;
                    let products = repo.list::<Product>().await?;
                    print_order_details(&order, customer.as_ref(), &products);
                }
            }
        }
        OrderCommand::Status { id, status } => {
            let order = orders::update_status(repo, &id, status.into()).await?;
            println!("O.S. #{}: {}", order.order_number, order.status);
        }
        OrderCommand::Item(ItemCommand::Add { order, product, quantity }) => {
            let order = orders::add_item(repo, &order, &product, quantity).await?;
            println!("O.S. #{} total: {}", order.order_number, format_currency(order.total));
        }
        OrderCommand::Item(ItemCommand::Remove { order, index }) => {
            let order = orders::remove_item(repo, &order, index).await?;
            println!("O.S. #{} total: {}", order.order_number, format_currency(order.total));
        }
        OrderCommand::Close { id, method } => {
            let order = orders::close_order(repo, &id, method).await?;
            println!(
                "O.S. #{} entregue e paga: {}",
                order.order_number,
                format_currency(order.total)
            );
        }
        OrderCommand::Occurrence { id, description, kind } => {
            let order = orders::add_occurrence(repo, &id, kind.into(), &description).await?;
            println!("O.S. #{}: {} ocorrência(s)", order.order_number, order.occurrences.len());
        }
        OrderCommand::Photo { id, path } => {
            let order = orders::attach_photo(repo, &id, &path).await?;
            println!("O.S. #{}: {} foto(s)", order.order_number, order.photos.len());
        }
        OrderCommand::Print { id, output } => {
            let html = print::order_document(repo, &id).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, html)?;
                    println!("Documento salvo em {}", path.display());
                }
                None => print!("{html}"),
            }
        }
        OrderCommand::Notify { id } => {
            println!("{}", notify::order_notification(repo, &config.notify, &id).await?);
        }
        OrderCommand::Checklist { id, item, fail, observations } => {
            let order = orders::set_checklist(repo, &id, &item, !fail, observations).await?;
            let passed = order.checklist.values().filter(|p| **p).count();
            println!(
                "O.S. #{} checklist: {passed}/{} ok",
                order.order_number,
                order.checklist.len()
            );
        }
        OrderCommand::Delete { id } => delete_record::<ServiceOrder>(repo, &id).await?,
    }
    Ok(())
}

// === Sales ===

async fn handle_sale(repo: &Repository, cmd: SaleCommand) -> CliResult {
    match cmd {
        SaleCommand::New { items, method, customer } => {
            let mut cart = Cart::new();
            for (product_id, quantity) in items {
                let product = repo.require::<Product>(&product_id).await?;
                cart.add(&product, quantity)?;
            }
            let sale =
                sales::finalize(repo, cart, method.as_deref(), customer.as_deref()).await?;
            println!(
                "Venda registrada: {} ({}) {}",
                format_currency(sale.total),
                sale.payment_method,
                sale.id
            );
        }
        SaleCommand::List(f) => list_records::<Sale>(repo, f.format).await?,
        SaleCommand::Catalogue { query, format } => {
            let products = sales::catalogue(repo.list::<Product>().await?, &query);
            print_list(&products, format.format)?;
        }
    }
    Ok(())
}

// === Accounts ===

fn account_filter(args: AccountFilterArgs) -> AccountFilter {
    AccountFilter {
        kind: args.kind.map(Into::into),
        status: args.status.map(Into::into),
    }
}

async fn handle_account(repo: &Repository, cmd: AccountCommand) -> CliResult {
    match cmd {
        AccountCommand::Add { description, amount, due, kind, category, related } => {
            let mut account = FinancialAccount::new(description, amount, due);
            account.kind = kind.into();
            if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
                account.category = category;
            }
            account.related_id = related;
            accounts::save_account(repo, &account).await?;
            saved(&account);
        }
        AccountCommand::Edit {
            id,
            description,
            amount,
            due,
            kind,
            status,
            category,
            related,
        } => {
            let mut account = repo.require::<FinancialAccount>(&id).await?;
            if let Some(description) = description {
                account.description = description;
            }
            if let Some(amount) = amount {
                account.amount = amount;
            }
            if let Some(due) = due {
                account.due_date = due;
            }
            if let Some(kind) = kind {
                account.kind = kind.into();
            }
            if let Some(status) = status {
                account.status = status.into();
            }
            if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
                account.category = category;
            }
            if related.is_some() {
                account.related_id = related;
            }
            accounts::save_account(repo, &account).await?;
            saved(&account);
        }
        AccountCommand::List { filter, format } => {
            let list = account_filter(filter).apply(repo.list::<FinancialAccount>().await?);
            print_list(&list, format.format)?;
        }
        AccountCommand::Toggle { id } => {
            let account = accounts::toggle_status(repo, &id).await?;
            println!("{}: {}", account.description, accounts::status_label(&account));
        }
        AccountCommand::Delete { id } => delete_record::<FinancialAccount>(repo, &id).await?,
        AccountCommand::Summary { filter, format } => {
            let list = account_filter(filter).apply(repo.list::<FinancialAccount>().await?);
            let summary = accounts::summarize(&list);
            match format.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Plain => {
                    println!("A pagar (pendente):   {}", format_currency(summary.payable));
                    println!("A receber (pendente): {}", format_currency(summary.receivable));
                    println!("Saldo previsto:       {}", format_currency(summary.balance()));
                }
            }
        }
    }
    Ok(())
}

// === Reports ===

async fn load_dashboard(repo: &Repository, config: &Config) -> CliResult<reports::Dashboard> {
    let orders = repo.list::<ServiceOrder>().await?;
    let sales = repo.list::<Sale>().await?;
    let products = repo.list::<Product>().await?;
    Ok(reports::dashboard(
        &orders,
        &sales,
        &products,
        config.dashboard.low_stock_threshold,
    ))
}

async fn handle_report(repo: &Repository, config: &Config, cmd: ReportCommand) -> CliResult {
    match cmd {
        ReportCommand::Finance { month, all, format } => {
            let month = if all {
                String::new()
            } else {
                month.unwrap_or_else(|| Utc::now().format("%Y-%m").to_string())
            };
            let orders = repo.list::<ServiceOrder>().await?;
            let sales = repo.list::<Sale>().await?;
            let report = reports::finance_report(&orders, &sales, &month);
            match format.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Plain => {
                    let period = if report.month.is_empty() { "todo o período" } else { report.month.as_str() };
                    println!("Financeiro: {period}");
                    println!("Faturamento total: {}", format_currency(report.total));
                    println!("Ordens de serviço: {}", format_currency(report.from_orders));
                    println!("Vendas diretas:    {}", format_currency(report.from_sales));
                    for (method, value) in &report.by_method {
                        println!("  {method}: {}", format_currency(*value));
                    }
                    println!();
                    for t in &report.transactions {
                        println!(
                            "{}  {}  {}  {}",
                            t.date.format("%d/%m/%Y"),
                            t.description,
                            t.method,
                            format_currency(t.amount)
                        );
                    }
                }
            }
        }
        ReportCommand::Dashboard(f) => {
            let dash = load_dashboard(repo, config).await?;
            match f.format {
                OutputFormat::Json => print_json(&dash)?,
                OutputFormat::Plain => {
                    println!("Receita O.S.:   {}", format_currency(dash.order_revenue));
                    println!("Receita vendas: {}", format_currency(dash.sales_revenue));
                    println!("Receita total:  {}", format_currency(dash.total_revenue));
                    println!("Ticket médio:   {}", format_currency(dash.average_ticket));
                    println!("Ordens:         {}", dash.order_count);
                    for (status, count) in &dash.status_counts {
                        println!("  {status}: {count}");
                    }
                    if !dash.low_stock.is_empty() {
                        println!("Estoque baixo:");
                        for product in &dash.low_stock {
                            println!("  {} ({})", product.name, product.stock);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

// === Settings ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    business_info: BusinessInfo,
    checklist: Vec<String>,
    terms_entry: String,
    terms_budget: String,
    terms_exit: String,
    default_warranty: u32,
}

async fn handle_settings(repo: &Repository, cmd: SettingsCommand) -> CliResult {
    match cmd {
        SettingsCommand::Show(f) => {
            let view = SettingsView {
                business_info: settings::business_info(repo).await?,
                checklist: settings::checklist_items(repo).await?,
                terms_entry: settings::terms(repo, TermsKind::Entry).await?,
                terms_budget: settings::terms(repo, TermsKind::Budget).await?,
                terms_exit: settings::terms(repo, TermsKind::Exit).await?,
                default_warranty: settings::default_warranty(repo).await?,
            };
            match f.format {
                OutputFormat::Json => print_json(&view)?,
                OutputFormat::Plain => {
                    let biz = &view.business_info;
                    println!("Empresa:   {}", biz.name);
                    println!("CNPJ/CPF:  {}", biz.cnpj);
                    println!("Telefone:  {}", biz.phone);
                    println!("Endereço:  {}", biz.address);
                    println!("Garantia:  {} dias", view.default_warranty);
                    println!("Checklist:");
                    for (index, item) in view.checklist.iter().enumerate() {
                        println!("  [{index}] {item}");
                    }
                    println!("{} {}", TermsKind::Entry.title(), view.terms_entry);
                    println!("{} {}", TermsKind::Budget.title(), view.terms_budget);
                    println!("{} {}", TermsKind::Exit.title(), view.terms_exit);
                }
            }
        }
        SettingsCommand::Business { name, cnpj, phone, address, logo_url } => {
            let mut info = settings::business_info(repo).await?;
            if let Some(name) = name {
                info.name = name;
            }
            if let Some(cnpj) = cnpj {
                info.cnpj = cnpj;
            }
            if let Some(phone) = phone {
                info.phone = phone;
            }
            if let Some(address) = address {
                info.address = address;
            }
            if logo_url.is_some() {
                info.logo_url = logo_url;
            }
            settings::save_business_info(repo, &info).await?;
            println!("Dados da empresa salvos.");
        }
        SettingsCommand::ChecklistAdd { item } => {
            let items = settings::add_checklist_item(repo, &item).await?;
            println!("Checklist: {}", items.join(", "));
        }
        SettingsCommand::ChecklistRemove { index } => {
            let items = settings::remove_checklist_item(repo, index).await?;
            println!("Checklist: {}", items.join(", "));
        }
        SettingsCommand::Terms { kind, text } => {
            let kind = TermsKind::from(kind);
            if let Some(text) = text {
                settings::save_terms(repo, kind, &text).await?;
            }
            println!("{} {}", kind.title(), settings::terms(repo, kind).await?);
        }
        SettingsCommand::Warranty { days } => {
            if let Some(days) = days {
                settings::save_default_warranty(repo, days).await?;
            }
            println!("Garantia padrão: {} dias", settings::default_warranty(repo).await?);
        }
    }
    Ok(())
}

// === Database ===

fn print_sync_report(action: &str, report: &SyncReport) {
    println!(
        "{action}: {} tentativa(s), {} enviada(s), {} falha(s)",
        report.attempted, report.pushed, report.failed
    );
    for error in &report.errors {
        println!("  {error}");
    }
}

async fn handle_db(repo: &Repository, config: &Config, cmd: DbCommand) -> CliResult {
    match cmd {
        DbCommand::Test => {
            repo.test_connection().await?;
            println!("Conexão com o banco em nuvem OK.");
        }
        DbCommand::Init => {
            repo.initialize_remote().await?;
            println!("Tabelas na nuvem criadas/atualizadas.");
        }
        DbCommand::Sync => print_sync_report("Sincronização", &repo.sync_pending().await?),
        DbCommand::Push => print_sync_report("Envio completo", &repo.push_all().await?),
        DbCommand::Status(f) => {
            let stats = repo.storage().stats()?;
            let mode = if repo.is_cloud() { "nuvem" } else { "local" };
            match f.format {
                OutputFormat::Json => {
                    let collections: serde_json::Map<String, serde_json::Value> = stats
                        .collections
                        .iter()
                        .map(|(c, n)| (c.table().to_string(), (*n).into()))
                        .collect();
                    print_json(&serde_json::json!({
                        "mode": mode,
                        "database_path": config.database_path(),
                        "schema_version": stats.schema_version,
                        "db_size_bytes": stats.db_size_bytes,
                        "settings": stats.settings,
                        "pending_sync": stats.pending_sync,
                        "collections": collections,
                    }))?;
                }
                OutputFormat::Plain => {
                    println!("fixos database");
                    println!("--------------");
                    println!("Modo:           {mode}");
                    println!("Arquivo:        {}", config.database_path().display());
                    println!("Schema:         v{}", stats.schema_version);
                    println!("Tamanho:        {} bytes", stats.db_size_bytes);
                    for (collection, count) in &stats.collections {
                        println!("  {:<20}{count}", collection.table());
                    }
                    println!("Configurações:  {}", stats.settings);
                    println!("Pendentes sync: {}", stats.pending_sync);
                }
            }
        }
    }
    Ok(())
}

// === Lookups and assistant ===

async fn handle_cep(config: &Config, cep: &str) -> CliResult {
    let lookup = PostalLookup::from_config(&config.lookup)?;
    match lookup.address(cep).await {
        Some(address) => {
            println!("{address}");
            Ok(())
        }
        None => Err(Error::not_found("postal code", cep).into()),
    }
}

async fn handle_assist(repo: &Repository, config: &Config, cmd: AssistCommand) -> CliResult {
    let assistant = Assistant::from_config(&config.assistant)?;
    if !assistant.is_enabled() {
        warn!("assistant.api_key is not set; answers will be the fallback text");
    }
    match cmd {
        AssistCommand::Report { problem, order } => {
            let problem = if order {
                repo.require::<ServiceOrder>(&problem)
                    .await?
                    .problem_description
            } else {
                problem
            };
            println!("{}", assistant.technical_report(&problem).await);
        }
        AssistCommand::Insights => {
            let dash = load_dashboard(repo, config).await?;
            println!("{}", assistant.business_insights(&dash).await);
        }
    }
    Ok(())
}

// === Configuration ===

fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.cloud.database_url.is_some() {
        shown.cloud.database_url = Some("********".to_string());
    }
    if shown.assistant.api_key.is_some() {
        shown.assistant.api_key = Some("********".to_string());
    }
    shown
}

fn validate_config(path: Option<PathBuf>) {
    let path = path.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            let shown = redacted(config);
            if json {
                print_json(&shown)?;
            } else {
                let set = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", shown.database_path().display());
                println!();
                println!("[Cloud]");
                println!("  Enabled:            {}", shown.cloud.enabled);
                println!("  Database URL:       {}", set(&shown.cloud.database_url));
                println!("  Max connections:    {}", shown.cloud.max_connections);
                println!();
                println!("[Lookup]");
                println!("  Postal code URL:    {}", shown.lookup.postal_code_url);
                println!("  Timeout (s):        {}", shown.lookup.timeout_secs);
                println!();
                println!("[Assistant]");
                println!("  API key:            {}", set(&shown.assistant.api_key));
                println!("  Model:              {}", shown.assistant.model);
                println!("  Endpoint:           {}", shown.assistant.endpoint);
                println!("  Timeout (s):        {}", shown.assistant.timeout_secs);
                println!();
                println!("[Notify]");
                println!("  Country code:       {}", shown.notify.country_code);
                println!("  Template:           {}", shown.notify.template);
                println!();
                println!("[Dashboard]");
                println!("  Low stock at:       {}", shown.dashboard.low_stock_threshold);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => validate_config(file),
    }
    Ok(())
}
