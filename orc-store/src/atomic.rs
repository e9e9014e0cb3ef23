use crate::error::{Error, Result};
use crate::store::{Entry, Store};

/// Retry `transform` against the current value of `key` until it succeeds or `transform`
/// returns `None` (the "no change" sentinel). `transform` sees `None` if the key is
/// absent and may return `Some` to create it.
///
/// On `Conflict` (another writer raced us) the current value is re-read and `transform` is
/// invoked again — this is the CAS retry loop every control loop's writes go through, so
/// none of them need to hand-roll it.
pub async fn atomic_update<S, F>(store: &S, key: &str, mut transform: F) -> Result<Option<Entry>>
where
    S: Store + ?Sized,
    F: FnMut(Option<&serde_json::Value>) -> Option<serde_json::Value>,
{
    loop {
        let current = match store.get(key).await {
            Ok(entry) => Some(entry),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let prev_index = current.as_ref().map(|e| e.index);
        let Some(next_value) = transform(current.as_ref().map(|e| &e.value)) else {
            return Ok(current);
        };
        match store.set(key, next_value.clone(), prev_index).await {
            Ok(index) => {
                return Ok(Some(Entry {
                    key: key.to_string(),
                    value: next_value,
                    index,
                }))
            }
            Err(Error::Conflict { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemStore;

    #[tokio::test]
    async fn creates_when_absent() {
        let store = MemStore::new();
        let result = atomic_update(&store, "k1", |current| {
            assert!(current.is_none());
            Some(serde_json::json!({"n": 1}))
        })
        .await
        .unwrap();
        assert_eq!(result.unwrap().value, serde_json::json!({"n": 1}));
    }

    #[tokio::test]
    async fn no_change_sentinel_leaves_value_untouched() {
        let store = MemStore::new();
        store.set("k1", serde_json::json!({"n": 1}), None).await.unwrap();
        let result = atomic_update(&store, "k1", |_| None).await.unwrap();
        assert_eq!(result.unwrap().value, serde_json::json!({"n": 1}));
        let entry = store.get("k1").await.unwrap();
        assert_eq!(entry.index, 1);
    }

    #[tokio::test]
    async fn transform_sees_the_latest_value() {
        let store = MemStore::new();
        store.set("k1", serde_json::json!({"n": 1}), None).await.unwrap();
        // A writer lands before atomic_update runs; transform must see its result, not
        // whatever was current when the caller decided to call atomic_update.
        store.set("k1", serde_json::json!({"n": 2}), Some(1)).await.unwrap();

        let result = atomic_update(&store, "k1", |current| {
            let n = current.unwrap()["n"].as_i64().unwrap();
            Some(serde_json::json!({"n": n + 10}))
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(result.value["n"], 12);
    }
}
