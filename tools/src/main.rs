//! catalog-admin: headless administration for the product catalog.
//!
//! Usage:
//!   catalog-admin import --dir ./workbook --role admin
//!   catalog-admin purge --role admin --yes
//!   catalog-admin list --search tea --category Drinks --store S01 --as-of 2024-08-01
//!   catalog-admin resolve --sku SKU-1 --as-of 2024-03-01
//!   catalog-admin categories
//!
//! Global flags: --config <file.json>, --db <sqlite path>, --json.
//! The database path may also come from CATALOG_DATABASE_PATH.

mod args;

use anyhow::{bail, Context, Result};
use args::{flag_value, flag_values, has_flag, parse_as_of};
use catalog_core::{
    access::{ensure_admin, CurrentUser, Role},
    catalog::Catalog,
    config::CatalogConfig,
    error::CatalogError,
    import::Workbook,
    reconciler::{Disposition, ImportReport},
};
use chrono::NaiveDate;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        return Ok(());
    };
    if command == "help" || command == "--help" {
        print_usage();
        return Ok(());
    }

    let catalog = match open_catalog(&args) {
        Ok(c) => c,
        Err(e) => {
            // Configuration problems stop everything.
            eprintln!("catalog-admin: {e:#}");
            std::process::exit(2);
        }
    };
    let json = has_flag(&args, "--json");

    match command {
        "import" => run_import(&catalog, &args, json),
        "purge" => run_purge(&catalog, &args, json),
        "list" => run_list(&catalog, &args, json),
        "resolve" => run_resolve(&catalog, &args, json),
        "categories" => {
            for category in catalog.categories()? {
                println!("{category}");
            }
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command '{other}'")
        }
    }
}

fn open_catalog(args: &[String]) -> Result<Catalog> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::from_env()?,
    };
    if let Some(db) = flag_value(args, "--db") {
        config.database_path = Some(db.to_string());
    }
    Ok(Catalog::open(config)?)
}

fn current_user(args: &[String]) -> Result<CurrentUser> {
    let role_text = match flag_value(args, "--role") {
        Some(r) => r.to_string(),
        None => env::var("CATALOG_USER_ROLE").unwrap_or_else(|_| "viewer".to_string()),
    };
    let role: Role = role_text.parse()?;
    let email = flag_value(args, "--email").unwrap_or("cli@localhost");
    Ok(CurrentUser::new(email, role))
}

fn run_import(catalog: &Catalog, args: &[String], json: bool) -> Result<()> {
    ensure_admin(&current_user(args)?)?;
    let dir = flag_value(args, "--dir").context("import needs --dir <workbook directory>")?;
    let workbook = Workbook::from_csv_dir(dir)?;
    if workbook.sheet_names().is_empty() {
        log::warn!("import: no known sheets in {dir}");
    }
    let report = catalog.import_workbook(&workbook)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_purge(catalog: &Catalog, args: &[String], json: bool) -> Result<()> {
    ensure_admin(&current_user(args)?)?;
    if !has_flag(args, "--yes") {
        bail!("purge deletes every product, store, price, cost and photo; re-run with --yes");
    }
    let counts = catalog.purge()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        println!(
            "purged: {} products, {} stores, {} prices, {} costs, {} photos",
            counts.products, counts.stores, counts.prices, counts.costs, counts.photos
        );
    }
    Ok(())
}

fn run_list(catalog: &Catalog, args: &[String], json: bool) -> Result<()> {
    let search = flag_value(args, "--search").unwrap_or("");
    let categories = flag_values(args, "--category");
    let as_of = as_of(catalog, args)?;
    let cards = catalog.cards(search, &categories, as_of, flag_value(args, "--store"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }
    println!("{} product(s) as of {as_of}", cards.len());
    for card in &cards {
        let p = &card.product;
        let detail = match &card.metrics {
            Some(m) => m.to_string(),
            None => "no active price".to_string(),
        };
        println!(
            "  {:<14} {:<32} {:<14} {detail}",
            p.sku,
            p.name,
            p.brand.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn run_resolve(catalog: &Catalog, args: &[String], json: bool) -> Result<()> {
    let sku = flag_value(args, "--sku").context("resolve needs --sku <sku>")?;
    let as_of = as_of(catalog, args)?;
    let product = catalog
        .store
        .product_by_sku(sku)?
        .ok_or_else(|| CatalogError::UnresolvedReference {
            field: "sku",
            value: sku.to_string(),
        })?;
    let store_id = match flag_value(args, "--store") {
        Some(code) => Some(
            catalog
                .store
                .store_id_by_code(code)?
                .ok_or_else(|| CatalogError::UnresolvedReference {
                    field: "store_code",
                    value: code.to_string(),
                })?,
        ),
        None => None,
    };

    let price = catalog.resolve_price(&product.id, as_of, store_id.as_deref())?;
    let cost = catalog.resolve_cost(&product.id, as_of)?;
    let metrics = price
        .as_ref()
        .map(|p| catalog.metrics(p.value, cost.as_ref().map(|c| c.value)));

    if json {
        let out = serde_json::json!({
            "sku": product.sku,
            "as_of": as_of,
            "price": price,
            "cost": cost,
            "metrics": metrics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("{} {} as of {as_of}", product.sku, product.name);
    match &price {
        Some(p) => println!(
            "  price {:.2} (from {}{})",
            p.value,
            p.valid_from,
            p.valid_to.map(|t| format!(" to {t}")).unwrap_or_default()
        ),
        None => println!("  no active price"),
    }
    match &cost {
        Some(c) => println!("  cost  {:.4} (from {})", c.value, c.valid_from),
        None => println!("  no active cost"),
    }
    if let Some(m) = metrics {
        println!("  {m}");
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    for result in &report.sheets {
        println!(
            "{:<10} {:>5} rows  {:>5} changed  {:>5} unchanged  {:>5} skipped",
            result.kind.sheet_name(),
            result.total(),
            result.changed(),
            result.accepted() - result.changed(),
            result.skipped()
        );
        for row in result.skipped_rows() {
            if let Disposition::Skipped { reason } = &row.disposition {
                println!(
                    "    line {:>4} {:<14} {reason}",
                    row.line,
                    row.key.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

fn as_of(catalog: &Catalog, args: &[String]) -> Result<NaiveDate> {
    parse_as_of(flag_value(args, "--as-of"), catalog.today())
}

fn print_usage() {
    println!("catalog-admin <import|purge|list|resolve|categories> [flags]");
    println!("  import      --dir <dir> --role admin       reconcile <sheet>.csv files");
    println!("  purge       --role admin --yes             delete the whole catalog");
    println!("  list        [--search q] [--category c]... [--store code] [--as-of date]");
    println!("  resolve     --sku <sku> [--store code] [--as-of date]");
    println!("  categories                                 distinct product categories");
    println!("global: --config <file.json> --db <path> --json");
}
