//! Route handlers guarded by profile limiters.
//!
//! Run with:
//! ```
//! RUST_LOG=admission_ratelimit=debug cargo run --example route_handlers
//! ```

use admission_ratelimit::config::profiles;
use admission_ratelimit::{Admission, Identity, LimiterRegistry, RegistryConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = LimiterRegistry::from_config(&RegistryConfig::from_env()?)?;

    println!("=== Route Handler Admission Demo ===\n");

    // (route, profile, requests to send)
    let routes = [
        ("/api/data", profiles::GENERAL_API, 3),
        ("/api/auth/login", profiles::AUTH, 7),
        ("/api/contact", profiles::CONTACT_FORM, 4),
        ("/api/newsletter", profiles::NEWSLETTER, 2),
    ];

    let visitor = Identity::new().with_header("x-forwarded-for", "203.0.113.50, 10.0.0.1");

    for (route, profile, count) in routes {
        let limiter = registry.get(profile)?;
        let quota = limiter.quota();
        println!(
            "Route: {} (profile {}: {}/{}s, sending {} requests)",
            route,
            profile,
            quota.max_requests(),
            quota.window().as_secs(),
            count
        );

        for _ in 0..count {
            let result = limiter.check(&visitor)?;
            match Admission::render(&result) {
                Admission::Proceed { headers } => {
                    println!("  200 {:?}", headers);
                }
                Admission::Reject { status, headers, body } => {
                    println!("  {} {} {:?}", status, body.to_json(), headers);
                }
            }
        }
        println!();
    }

    // Signed-in users are counted by id, not address.
    let per_user = registry.get(profiles::PER_USER_API)?;
    let user = visitor.clone().with_user_id("42");
    println!("per-user key: {}", per_user.derive_key(&user));
    println!("anonymous key: {}", per_user.derive_key(&Identity::new()));

    registry.destroy_all();
    Ok(())
}
