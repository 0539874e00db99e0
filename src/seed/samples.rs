//! Sample products: the fixed demo set and a random generator for bulk catalogs.

use crate::model::ProductCreate;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Prefix of every seeded product ID.
pub const SEED_ID_PREFIX: &str = "seed-";

/// Category vocabulary for generated products.
pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Home",
    "Sports",
    "Outdoors",
    "Health",
    "Beauty",
    "Automotive",
    "Toys",
    "Books",
];

const ADJECTIVES: &[&str] = &[
    "Compact", "Deluxe", "Ergonomic", "Rustic", "Sleek", "Smart", "Practical", "Rugged",
    "Portable", "Premium", "Classic", "Modern",
];

const MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Cotton", "Leather", "Bamboo", "Granite", "Plastic", "Rubber",
    "Carbon", "Glass", "Wool", "Aluminum",
];

const NOUNS: &[&str] = &[
    "Chair", "Lamp", "Backpack", "Bottle", "Keyboard", "Headphones", "Table", "Jacket",
    "Watch", "Speaker", "Blender", "Tent", "Helmet", "Notebook",
];

/// The curated records written before any generated ones.
pub fn base_products() -> Vec<ProductCreate> {
    vec![
        ProductCreate::new(
            "Laptop Pro 15",
            "High-performance laptop with 16GB RAM and 512GB SSD",
            1299.99,
            "Electronics",
            50,
        )
        .with_id("seed-1"),
        ProductCreate::new(
            "Wireless Mouse",
            "Ergonomic wireless mouse with long battery life",
            29.99,
            "Electronics",
            200,
        )
        .with_id("seed-2"),
        ProductCreate::new(
            "Office Chair",
            "Comfortable ergonomic office chair with lumbar support",
            199.99,
            "Furniture",
            30,
        )
        .with_id("seed-3"),
        ProductCreate::new(
            "Coffee Maker",
            "Automatic drip coffee maker with programmable timer",
            79.99,
            "Appliances",
            75,
        )
        .with_id("seed-4"),
        ProductCreate::new(
            "Running Shoes",
            "Lightweight running shoes with breathable mesh",
            89.99,
            "Sports",
            120,
        )
        .with_id("seed-5"),
    ]
}

/// Produces random products with `seed-<uuid>` IDs.
pub struct SampleGenerator {
    rng: StdRng,
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl SampleGenerator {
    /// A generator with reproducible field values. IDs stay random.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> String {
        format!("{}{}", SEED_ID_PREFIX, uuid::Uuid::new_v4().simple())
    }

    pub fn next_product(&mut self, id: String) -> ProductCreate {
        let rng = &mut self.rng;
        let name = format!(
            "{} {} {}",
            pick(rng, ADJECTIVES),
            pick(rng, MATERIALS),
            pick(rng, NOUNS)
        );
        let description: String = Sentence(6..14).fake_with_rng(rng);
        let price = rng.gen_range(500..500_000) as f64 / 100.0;
        let stock = rng.gen_range(0..=1000);
        let category = pick(rng, CATEGORIES);

        ProductCreate::new(name, description, price, category, stock).with_id(id)
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}
