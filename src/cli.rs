use std::io::{self, Write};

use assetdesk::actions::ActionResult;
use assetdesk::aggregate::{BucketCounts, CollectionStats};
use assetdesk::depreciation::DepreciationReport;
use assetdesk::model::{CollectionKind, Listable, Record, Warehouse};
use assetdesk::paginate::Page;
use assetdesk::parser::{self, Command};
use assetdesk::server::StatusBody;
use clap::Parser;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Interactive client for the assetdesk API", long_about = None)]
struct Args {
    #[clap(long, default_value = "http://127.0.0.1:9000")]
    host: String,
}

struct Session {
    client: Client,
    host: String,
    /// Fetched once at connect; used to print warehouse names next to stock.
    warehouses: Vec<Warehouse>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    print_banner();

    let mut session = Session { client: Client::new(), host: args.host.trim_end_matches('/').to_string(), warehouses: Vec::new() };

    match session.call::<Vec<Warehouse>, ()>(Method::GET, "/api/warehouses", &[], None).await {
        Ok(envelope) => {
            session.warehouses = envelope.data.unwrap_or_default();
            println!("[\u{2713}] Connected to assetdesk at {}!", session.host);
        }
        Err(_) => {
            println!("[\u{2717}] Could not connect to server at {}.", session.host);
            println!("    Make sure to run 'cargo run --bin assetdesk' in another terminal.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("assetdesk> ");
        if io::stdout().flush().is_err() {
            break;
        }
        buffer.clear();

        match stdin.read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if buffer.trim().is_empty() {
            continue;
        }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = session.execute(cmd).await {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.contains('=') && !buffer.contains('\'') && !buffer.contains('"') {
                    println!("    \u{2139}\u{fe0f}  Hint: Quote filter values: WHERE status='tersedia'");
                } else if buffer.to_uppercase().starts_with("SELECT") {
                    println!("    \u{2139}\u{fe0f}  Hint: Try 'LIST assets WHERE status='tersedia' PAGE 1'");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   assetdesk CLI - Asset & Inventory Back Office");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. LIST:         LIST assets WHERE status='tersedia' AND facility='Gedung A' SEARCH \"pompa\" PAGE 1 SIZE 10");
    println!("2. GET:          GET inventory 'INV-001'");
    println!("3. STATS:        STATS assets WHERE category='IT'");
    println!("4. DEPRECIATION: DEPRECIATION AS OF 2026-12-31");
    println!("5. UPDATE:       UPDATE returns SET STATUS='disetujui' WHERE CODE='RT-001'");
    println!("6. DELETE:       DELETE FROM purchases WHERE CODE='PO-001'");
    println!("7. WAREHOUSES:   WAREHOUSES");
    println!("8. EXIT:         Quit");
    println!("Collections: assets, inventory, returns, purchases");
    println!("Filter keys: search, status, category, facility, criticality, from, to, min, max\n");
}

impl Session {
    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<ActionResult<T>, String>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let mut request = self.client.request(method, format!("{}{}", self.host, path)).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        response.json::<ActionResult<T>>().await.map_err(|e| e.to_string())
    }

    async fn execute(&mut self, cmd: Command) -> Result<(), String> {
        match cmd {
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::List { collection, filters, search, page, size } => {
                let state = parser::filter_state(&filters, search.as_deref());
                let query = parser::query_pairs(&state, page, size);
                let envelope = self
                    .call::<Page<Record>, ()>(Method::GET, &format!("/api/{collection}"), &query, None)
                    .await?;
                let page = unwrap_envelope(envelope)?;
                self.print_page(collection, &page);
                Ok(())
            }
            Command::Get { collection, code } => {
                let envelope = self
                    .call::<Record, ()>(Method::GET, &record_path(collection, &code), &[], None)
                    .await?;
                let record = unwrap_envelope(envelope)?;
                print_record(&record);
                Ok(())
            }
            Command::Stats { collection, filters } => {
                let state = parser::filter_state(&filters, None);
                let query = parser::query_pairs(&state, None, None);
                let envelope = self
                    .call::<CollectionStats, ()>(Method::GET, &format!("/api/{collection}/stats"), &query, None)
                    .await?;
                print_stats(&unwrap_envelope(envelope)?);
                Ok(())
            }
            Command::Depreciation { as_of } => {
                let query: Vec<(String, String)> =
                    as_of.map(|d| vec![("as_of".to_string(), d.to_string())]).unwrap_or_default();
                let envelope = self
                    .call::<DepreciationReport, ()>(Method::GET, "/api/depreciation", &query, None)
                    .await?;
                print_depreciation(&unwrap_envelope(envelope)?);
                Ok(())
            }
            Command::Update { collection, code, status } => {
                let body = StatusBody { status };
                let envelope = self
                    .call::<Record, StatusBody>(Method::PUT, &format!("{}/status", record_path(collection, &code)), &[], Some(&body))
                    .await?;
                let record = unwrap_envelope(envelope)?;
                println!("[\u{2713} OK] {} is now '{}'", record.code(), record.status());
                Ok(())
            }
            Command::Delete { collection, code } => {
                let envelope = self
                    .call::<Record, ()>(Method::DELETE, &record_path(collection, &code), &[], None)
                    .await?;
                let record = unwrap_envelope(envelope)?;
                println!("[\u{2713} OK] Deleted {} from {}", record.code(), collection);
                Ok(())
            }
            Command::Warehouses => {
                let envelope = self.call::<Vec<Warehouse>, ()>(Method::GET, "/api/warehouses", &[], None).await?;
                self.warehouses = unwrap_envelope(envelope)?;
                for w in &self.warehouses {
                    println!("  {:<8} {:<24} {}", w.id, w.name, w.location);
                }
                Ok(())
            }
            Command::Exit => Ok(()),
        }
    }

    fn warehouse_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.warehouses
            .iter()
            .find(|w| w.id == id)
            .map_or(id, |w| w.name.as_str())
    }

    fn print_page(&self, collection: CollectionKind, page: &Page<Record>) {
        println!(
            "\n{} {} (page {} of {}, {} rows):",
            page.total,
            collection,
            if page.page_count == 0 { 0 } else { page.page + 1 },
            page.page_count,
            page.len()
        );
        for record in &page.items {
            let extra = match record {
                Record::Inventory(item) => format!("qty {} @ {}", item.quantity, self.warehouse_name(&item.warehouse_id)),
                other => other.amount().map(|a| format!("{a:.2}")).unwrap_or_default(),
            };
            println!(
                "  • {:<12} {:<28} {:<14} {:<12} {}",
                record.code(),
                record.name(),
                record.status(),
                record.facility(),
                extra
            );
        }
        println!();
    }
}

/// Codes may contain spaces or `/`, so they are sent percent-encoded.
fn record_path(collection: CollectionKind, code: &str) -> String {
    format!("/api/{collection}/{}", urlencoding::encode(code))
}

fn unwrap_envelope<T>(envelope: ActionResult<T>) -> Result<T, String> {
    if envelope.success {
        return envelope.data.ok_or_else(|| "empty response".to_string());
    }
    let mut message = envelope.message.unwrap_or_else(|| "request failed".to_string());
    for fe in &envelope.field_errors {
        message.push_str(&format!("\n    - {}: {}", fe.field, fe.message));
    }
    Err(message)
}

fn print_record(record: &Record) {
    match serde_json::to_string_pretty(record) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("[\u{2717}] {e}"),
    }
}

fn print_buckets(title: &str, counts: &BucketCounts) {
    let parts: Vec<String> = counts.buckets.iter().map(|b| format!("{} {}", b.label, b.count)).collect();
    if counts.unmapped > 0 {
        println!("  {:<12} {} | other {}", title, parts.join(" | "), counts.unmapped);
    } else {
        println!("  {:<12} {}", title, parts.join(" | "));
    }
}

fn print_stats(stats: &CollectionStats) {
    println!("\n{} ({} total):", stats.collection, stats.total);
    print_buckets("status", &stats.by_status);
    print_buckets("category", &stats.by_category);
    if let Some(criticality) = &stats.by_criticality {
        print_buckets("criticality", criticality);
    }
    if let Some(due) = stats.maintenance_due {
        println!("  {:<12} {}", "maint. due", due);
    }
    if let Some(low) = stats.low_stock {
        println!("  {:<12} {}", "low stock", low);
    }
    println!("  {:<12} {:.2}\n", "value", stats.total_value);
}

fn print_depreciation(report: &DepreciationReport) {
    println!("\nDepreciation as of {}:", report.as_of);
    for row in &report.rows {
        println!(
            "  {:<12} {:<28} cost {:>12.2} acc. {:>12.2} book {:>12.2}{}",
            row.code,
            row.name,
            row.purchase_cost,
            row.accumulated,
            row.book_value,
            if row.fully_depreciated { " (fully)" } else { "" }
        );
    }
    println!(
        "  {:<41} cost {:>12.2} acc. {:>12.2} book {:>12.2}\n",
        "TOTAL", report.total_cost, report.total_accumulated, report.total_book_value
    );
}
