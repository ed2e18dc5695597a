//! # Product Catalog Example
//!
//! This example walks through the main pieces of CrudHaus over the in-memory store,
//! so it runs without a database:
//! - Binding record types to models with `#[derive(Entity)]`
//! - A per-model service overriding one hook and keeping the others
//! - Paged reads driven by request parameters (search, order, deleted flags)
//! - Soft delete and restore
//! - Several writes committed or rolled back as one transaction
//!
//! Swap `CrudHaus::with_adapter(...)` for `CrudHaus::connect(AppConfig::load()?)` to run
//! the same code against PostgreSQL.

use crudhaus::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[entity(model = "product")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub category: Option<Value>,
    #[soft_delete]
    #[serde(default)]
    pub deleted_at: Option<String>,
}

/// Service with name normalization on create
pub struct ProductService {
    store: CrudStore<Product, MemoryStore>,
}

#[async_trait]
impl CrudService for ProductService {
    type Entity = Product;
    type Adapter = MemoryStore;

    fn store(&self) -> &CrudStore<Product, MemoryStore> {
        &self.store
    }

    fn searchables(&self) -> &[&str] {
        &["name", "category.name"]
    }

    fn base_filter(&self) -> Filter {
        Filter::new().condition("deleted_at", Condition::is_null())
    }

    fn default_order(&self) -> Vec<OrderBy> {
        vec![OrderBy::asc("id")]
    }

    async fn create(&self, data: Payload, options: &FindOptions) -> Result<Product, CrudError> {
        let data = match data.get("name").and_then(Value::as_str) {
            Some(name) => {
                let trimmed = name.trim().to_string();
                data.set("name", trimmed)
            }
            None => data,
        };
        self.store().create(data, options).await
    }
}

fn seed() -> MemoryStore {
    let categories = ["Mobile", "Computers", "Audio"];
    let records = (1..=12)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Product {}", i),
                "price": 100 * i,
                "category": { "name": categories[(i as usize) % categories.len()] },
            })
        })
        .collect();
    MemoryStore::new().with_records("product", records)
}

fn print_page(title: &str, page: &PaginatedResult<Product>) {
    println!(
        "{}: page {} of {} ({} of {} rows, prev {:?}, next {:?})",
        title,
        page.current_page,
        page.total_pages,
        page.count,
        page.total_count,
        page.previous_page,
        page.next_page
    );
    for product in &page.result {
        println!("   - #{} {} ({})", product.id, product.name, product.price);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 CrudHaus Catalog Example");
    println!("===========================");

    // 1. Setup
    println!("\n📊 Step 1: Coordinator Setup");
    println!("----------------------------");

    let mut crudhaus = CrudHaus::with_adapter(seed()).with_pagination(PaginationConfig {
        default_limit: 5,
        ..PaginationConfig::default()
    })?;
    let store = crudhaus.store::<Product>();
    crudhaus.register(ProductService { store })?;
    println!("✅ Registered services: {:?}", crudhaus.list());

    let service = crudhaus.get::<ProductService>()?;

    // 2. Paged reads
    println!("\n📖 Step 2: Paged Reads");
    println!("----------------------");

    let page = service
        .find_all(&PaginationParams::new().page(2), &FindOptions::new())
        .await?;
    print_page("Default window", &page);

    let params: PaginationParams = serde_json::from_value(json!({
        "search": "mobile",
        "order": "price:desc",
        "limit": "3",
    }))?;
    let page = service.find_all(&params, &FindOptions::new()).await?;
    print_page("Search 'mobile' by price desc", &page);

    // 3. Writes through hooks
    println!("\n✏️  Step 3: Create, Soft Delete, Restore");
    println!("----------------------------------------");

    let created = service
        .create(
            Payload::new().set("name", "  Tablet  ").set("price", 450),
            &FindOptions::new(),
        )
        .await?;
    println!("✅ Created #{} '{}'", created.id, created.name);

    let removed = service
        .soft_delete(RecordId::from(created.id), &FindOptions::new())
        .await?;
    println!("🗑️  Soft deleted at {:?}", removed.deleted_at);

    let deleted = service
        .find_all(&PaginationParams::new().deleted_only(), &FindOptions::new())
        .await?;
    print_page("Deleted only", &deleted);

    service
        .restore(RecordId::from(created.id), &FindOptions::new())
        .await?;
    println!("♻️  Restored #{}", created.id);

    // 4. Transactions
    println!("\n🔒 Step 4: Transactions");
    println!("-----------------------");

    let products = crudhaus.store::<Product>();
    crudhaus
        .transaction(|| async {
            products
                .update(1, Payload::new().set("price", 90), &FindOptions::new())
                .await?;
            products
                .update(2, Payload::new().set("price", 180), &FindOptions::new())
                .await?;
            Ok::<_, CrudHausError>(())
        })
        .await?;
    println!("✅ Repriced two products in one transaction");

    let failed = crudhaus
        .transaction(|| async {
            products.delete(3).await?;
            products.delete(999).await?;
            Ok::<_, CrudHausError>(())
        })
        .await;
    if let Err(e) = failed {
        println!("↩️  Rolled back: {}", e);
    }
    let still_there = products.find_one(3, &FindOptions::new()).await?;
    println!("   Product #3 still present: {}", still_there.is_some());

    // 5. Aggregation
    println!("\n📈 Step 5: Grouping");
    println!("-------------------");

    let total = products.count(&Filter::new()).await?;
    let cheap = products
        .count(&Filter::new().condition("price", Condition::lt(json!(500))))
        .await?;
    println!("{} products, {} under 500", total, cheap);

    let groups = products
        .group_by(&GroupBy::new(["price"]).window(Some(0), Some(3)))
        .await?;
    for group in groups {
        println!("   - price {} x {}", group["price"], group["_count"]["_all"]);
    }

    println!("\n🎉 Done at {}", chrono::Utc::now().to_rfc3339());
    Ok(())
}
