//! Write a small demo data set: `customers.parquet` and `orders.csv`, sharing
//! a `customer_id` column. Some names carry typos so fuzzy terms have
//! something to find, and a few ids exist on one side only.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const CUSTOMERS: &[(i64, &str, &str)] = &[
    (1, "John Smith", "Paris"),
    (2, "Jon Smyth", "Paris"),
    (3, "Mary Jones", "Berlin"),
    (4, "Marry Jones", "Berlin"),
    (5, "Acme Corp", "Rome"),
    (6, "ACME Corporation", "Rome"),
    (7, "Alice Martin", "Madrid"),
    (8, "Bob Stone", "Lisbon"),
];

fn write_customers(path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("city", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(
                CUSTOMERS.iter().map(|c| c.0).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                CUSTOMERS.iter().map(|c| c.1).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                CUSTOMERS.iter().map(|c| c.2).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building customers batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!("Wrote {} customers to {path}", CUSTOMERS.len());
    Ok(())
}

fn write_orders(path: &str, rng: &mut SimpleRng) -> Result<()> {
    let products = ["widget", "widgte", "gadget", "gizmo", "sprocket"];
    let statuses = ["shipped", "pending", "cancelled", "canceled"];

    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["customer_id", "order_id", "product", "status"])?;

    let mut order_id = 1000;
    // Ids 9 and 10 have orders but no customer record; 8 has no orders.
    for customer_id in [1, 2, 3, 4, 5, 6, 7, 9, 10] {
        let n_orders = 1 + rng.next_u64() % 3;
        for _ in 0..n_orders {
            writer.write_record([
                customer_id.to_string(),
                order_id.to_string(),
                rng.pick(&products).to_string(),
                rng.pick(&statuses).to_string(),
            ])?;
            order_id += 1;
        }
    }
    writer.flush()?;

    println!("Wrote {} orders to {path}", order_id - 1000);
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    write_customers("customers.parquet")?;
    write_orders("orders.csv", &mut rng)?;
    Ok(())
}
