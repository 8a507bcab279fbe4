//! Scripted terminal sessions against an in-memory store.

use till::cli::{Cli, Prompt};
use till::{AppConfig, Services};
use till_core::{Money, NewProduct, Role, TaxRate};
use till_db::{Database, DbConfig};

async fn store() -> (Services, AppConfig) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = AppConfig {
        tax_rate: TaxRate::from_bps(800),
        ..AppConfig::default()
    };
    let services = Services::new(&db, &config);
    let admin = services.users.ensure_default_admin().await.unwrap().unwrap();
    services
        .users
        .create_user(&admin, "carol", "till1234", Role::Cashier)
        .await
        .unwrap();
    services
        .catalogue
        .create(
            NewProduct::new("Widget", "A1", Money::from_cents(600), Money::from_cents(1000))
                .with_stock(5),
        )
        .await
        .unwrap();
    (services, config)
}

async fn run(services: Services, config: AppConfig, script: &str) -> String {
    let mut cli = Cli::new(services, config, Prompt::new(script.as_bytes(), Vec::new()));
    cli.run().await.unwrap();
    String::from_utf8(cli.into_prompt().into_output()).unwrap()
}

#[tokio::test]
async fn cashier_rings_up_a_discounted_sale() {
    let (services, config) = store().await;
    let script = concat!(
        "carol\ntill1234\n", // login
        "1\n",               // sell
        "a\nA1\n2\n",        // two widgets
        "d\n10%\n",          // ten percent off
        "p\ncash\n",         // pay
        "b\n0\n\n",          // back, log out, quit
    );

    let out = run(services.clone(), config, script).await;

    assert!(out.contains("Welcome, carol (cashier)."));
    assert!(!out.contains("[2] Products"));
    assert!(out.contains("[4] Change password"));
    assert!(out.contains("Amount due: $19.44"));
    assert!(out.contains("Paid by cash"));
    assert!(out.contains("Goodbye, carol."));
    assert!(out.ends_with("Bye.\n"));

    assert_eq!(services.catalogue.get("A1").await.unwrap().stock, 3);
}

#[tokio::test]
async fn overselling_is_reported_and_the_session_continues() {
    let (services, config) = store().await;
    let script = concat!(
        "carol\ntill1234\n",
        "1\n",
        "a\nA1\n9\n",
        "b\n0\n\n",
    );

    let out = run(services.clone(), config, script).await;

    assert!(out.contains("Error: Insufficient stock"));
    assert!(out.contains("Cart is empty."));
    assert_eq!(services.catalogue.get("A1").await.unwrap().stock, 5);
}

#[tokio::test]
async fn cashier_cannot_reach_admin_menus() {
    let (services, config) = store().await;
    let out = run(services, config, "carol\ntill1234\n2\n3\n0\n\n").await;

    assert_eq!(out.matches("Unknown choice.").count(), 2);
    assert!(!out.contains("== Products =="));
    assert!(!out.contains("== Reports =="));
}

#[tokio::test]
async fn admin_reads_todays_summary_and_adds_a_user() {
    let (services, config) = store().await;
    let script = concat!(
        "admin\nadmin\n",
        "3\ns\n\n\nb\n",                    // today's summary
        "4\nn\ndave\nmanager\npass1\npass1\nb\n", // new manager
        "0\n\n",
    );

    let out = run(services.clone(), config, script).await;

    assert!(out.contains("WARNING: the default admin password is in use"));
    assert!(out.contains("  Transactions: 0"));
    assert!(out.contains("Created dave (manager)."));
    assert!(services.users.authenticate("dave", "pass1").await.is_ok());
}
