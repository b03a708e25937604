use mongodb::bson::{doc, Document};
use mongodb::{options::ClientOptions, Client, Database};

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let client_options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client = Client::with_options(client_options).expect("Failed to initialize client");
        let db = client.database(db_name);
        MongoDB { client, db }
    }
}

/// Next synthetic integer id for a collection: max stored `id` + 1, or 1 when
/// the collection is empty. Read-then-insert, so concurrent allocators can
/// collide; acceptable for a single-process deployment.
pub async fn next_id(db: &Database, collection: &str) -> mongodb::error::Result<i64> {
    let coll = db.collection::<Document>(collection);
    let last = coll.find_one(doc! {}).sort(doc! { "id": -1 }).await?;
    Ok(match last {
        Some(doc) => read_id(&doc) + 1,
        None => 1,
    })
}

// Ids are written as Int64, but hand-seeded documents may carry Int32.
fn read_id(doc: &Document) -> i64 {
    doc.get_i64("id")
        .or_else(|_| doc.get_i32("id").map(i64::from))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::read_id;
    use mongodb::bson::{doc, Bson};

    #[test]
    fn read_id_handles_both_integer_widths() {
        assert_eq!(read_id(&doc! { "id": 7_i64 }), 7);
        assert_eq!(read_id(&doc! { "id": Bson::Int32(3) }), 3);
        assert_eq!(read_id(&doc! {}), 0);
    }
}
