//! Seen-posts tracking example for feedbloom
//!
//! This example demonstrates:
//! - Loading the seen-posts filter for a storage area
//! - Checking posts while rendering a feed
//! - Marking a post as seen when it is opened
//! - Reloading the state in a fresh process

use feedbloom::seen::{FileStorage, SeenPosts, SeenPostsRegistry};
use feedbloom::SeenPostsOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // One storage area per browser profile; a directory stands in for it here
    let storage = FileStorage::open("./seen_posts_data")?;
    println!("Storage opened at {:?}", storage.dir());

    let registry = SeenPostsRegistry::new(storage.clone());
    let seen = registry.get_default();

    // Render a feed: only read
    let feed: Vec<String> = (40..46).map(|i| format!("post-{}", i)).collect();
    println!("\nRendering feed:");
    for post in &feed {
        let state = if seen.lock().might_contain(post) { "seen" } else { "new" };
        println!("  {} [{}]", post, state);
    }

    // The viewer opens post-42
    println!("\nOpening post-42...");
    let written = seen.lock().mark_opened("post-42");
    println!("  filter written: {}", written);

    // A new session over the same storage
    let reloaded = SeenPosts::open(storage, SeenPostsOptions::default());
    println!("\nAfter reload:");
    for post in &feed {
        let state = if reloaded.might_contain(post) { "seen" } else { "new" };
        println!("  {} [{}]", post, state);
    }

    let filter = reloaded.filter();
    println!(
        "\nFilter: {} bits, {} hashes, {:.2}% full",
        filter.num_bits(),
        filter.num_hashes(),
        filter.fill_ratio() * 100.0
    );

    Ok(())
}
