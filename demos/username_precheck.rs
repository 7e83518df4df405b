//! Username precheck example for feedbloom
//!
//! This example demonstrates:
//! - Bulk-loading existing usernames at startup
//! - Availability checks that skip the directory for fresh names
//! - Registration recording the new name immediately
//! - How often the directory was actually consulted

use feedbloom::username::{MemoryDirectory, UserDirectory, UsernamePrecheck};
use feedbloom::PrecheckOptions;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Existing users, one of them since deleted
    let directory = MemoryDirectory::with_users(["alice", "Bob", "carol", "dave_99"]);
    directory.delete_user("carol");

    // Constructed once at startup and shared with every handler
    let precheck = Arc::new(UsernamePrecheck::new(PrecheckOptions::default()));
    let loaded = precheck.initialize(&directory)?;
    println!("Loaded {} usernames into the filter", loaded);

    println!("\nAvailability checks:");
    for name in ["alice", "BOB", "carol", "erin", "x!"] {
        let before = directory.lookups();
        match precheck.check_availability(&directory, name) {
            Ok(availability) => println!(
                "  {:<8} {:?} (directory consulted: {})",
                name,
                availability,
                directory.lookups() > before
            ),
            Err(e) => println!("  {:<8} rejected: {}", name, e),
        }
    }

    println!("\nRegistering erin...");
    precheck.register(&directory, "erin")?;
    println!("  erin taken now: {}", directory.username_taken("erin")?);

    match precheck.register(&directory, "Erin") {
        Ok(()) => println!("  Erin registered (unexpected)"),
        Err(e) => println!("  Erin rejected: {}", e),
    }

    let stats = precheck.stats();
    println!("\nPrecheck stats:");
    println!("  Insertions: {}", stats.insertions);
    println!("  Fast path hits: {}", stats.fast_path_hits);
    println!("  Directory lookups: {}", stats.fallback_lookups);
    println!("  Fast path rate: {:.1}%", stats.fast_path_rate() * 100.0);
    println!("  Filter fill: {:.3}%", stats.fill_ratio * 100.0);

    Ok(())
}
