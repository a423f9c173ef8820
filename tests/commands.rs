//! Integration tests for the command surface
//!
//! Every test runs against a private in-memory SQLite database.

use std::sync::Arc;

use ferrous_kv::{
    CommandError, Config, KvError, KvStore, SetOptions, SqliteBackend, SqliteConfig, StoreConfig,
};
use serde_json::{json, Value};

async fn store() -> KvStore<SqliteBackend> {
    KvStore::open(&Config::default()).await.unwrap()
}

async fn list_of(store: &KvStore<SqliteBackend>, key: &str, elements: &[&str]) {
    for element in elements {
        store.rpush(key, &json!(element)).await.unwrap();
    }
}

fn is_wrong_type<T: std::fmt::Debug>(result: Result<T, KvError>) -> bool {
    matches!(result, Err(KvError::Command(CommandError::WrongType)))
}

async fn sorted_keys(store: &KvStore<SqliteBackend>, pattern: &str) -> Vec<String> {
    let mut keys = store.keys(pattern).await.unwrap();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_value_types_round_trip() {
    let store = store().await;

    let values = vec![
        json!(42),
        json!(-3),
        json!(2.5),
        json!(2.0),
        json!("hello"),
        json!("42"),
        json!(true),
        json!(false),
        json!(null),
        json!([1, "two", [3.5]]),
        json!({"name": "ferrous", "tags": ["kv", "sql"]}),
    ];

    for (i, value) in values.iter().enumerate() {
        let key = format!("value:{}", i);
        store.set(&key, value, SetOptions::default()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_ref(), Some(value), "key {}", key);
    }
}

#[tokio::test]
async fn test_stored_null_is_not_absent() {
    let store = store().await;
    store.set("nothing", &Value::Null, SetOptions::default()).await.unwrap();

    assert_eq!(store.get("nothing").await.unwrap(), Some(Value::Null));
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_serialized_values() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Session {
        user: String,
        roles: Vec<String>,
    }

    let store = store().await;
    let session = Session { user: "ada".into(), roles: vec!["admin".into()] };
    store.set_serialized("session:1", &session, SetOptions::default()).await.unwrap();

    let back: Option<Session> = store.get_deserialized("session:1").await.unwrap();
    assert_eq!(back, Some(session));
}

#[tokio::test]
async fn test_set_overwrites_and_clears_expiry() {
    let store = store().await;

    store.set("k", &json!(1), SetOptions::ex(100)).await.unwrap();
    assert!(store.ttl("k").await.unwrap() > 0);

    store.set("k", &json!(2), SetOptions::default()).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    assert_eq!(store.ttl("k").await.unwrap(), -1);
}

#[tokio::test]
async fn test_conditional_set() {
    let store = store().await;

    assert!(store.set("lock", &json!("a"), SetOptions::nx()).await.unwrap());
    assert!(!store.set("lock", &json!("b"), SetOptions::nx()).await.unwrap());
    assert_eq!(store.get("lock").await.unwrap(), Some(json!("a")));

    assert!(!store.set("absent", &json!(1), SetOptions::xx()).await.unwrap());
    assert_eq!(store.get("absent").await.unwrap(), None);

    assert!(store.set("lock", &json!("c"), SetOptions::xx()).await.unwrap());
    assert_eq!(store.get("lock").await.unwrap(), Some(json!("c")));
}

#[tokio::test]
async fn test_nx_treats_expired_key_as_absent() {
    let store = store().await;

    store.set("lease", &json!("old"), SetOptions::ex(0)).await.unwrap();
    assert!(store.set("lease", &json!("new"), SetOptions::nx()).await.unwrap());
    assert_eq!(store.get("lease").await.unwrap(), Some(json!("new")));
    assert_eq!(store.ttl("lease").await.unwrap(), -1);
}

#[tokio::test]
async fn test_mset_and_mget() {
    let store = store().await;

    store
        .mset(&[("a", json!(1)), ("b", json!("x")), ("c", json!([true]))])
        .await
        .unwrap();

    let values = store.mget(&["a", "b", "c", "missing"]).await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values["a"], json!(1));
    assert_eq!(values["b"], json!("x"));
    assert_eq!(values["c"], json!([true]));
    assert!(!values.contains_key("missing"));

    store.mset(&[]).await.unwrap();
    assert!(store.mget(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mget_skips_expired_keys() {
    let store = store().await;
    store.set("live", &json!(1), SetOptions::default()).await.unwrap();
    store.set("dead", &json!(2), SetOptions::ex(0)).await.unwrap();

    let values = store.mget(&["live", "dead"]).await.unwrap();
    assert_eq!(values.len(), 1);
    assert!(values.contains_key("live"));
}

#[tokio::test]
async fn test_del_is_idempotent() {
    let store = store().await;
    store.set("a", &json!(1), SetOptions::default()).await.unwrap();
    store.set("b", &json!(2), SetOptions::default()).await.unwrap();

    assert_eq!(store.del(&["a", "b", "never"]).await.unwrap(), 2);
    assert_eq!(store.del(&["a", "b"]).await.unwrap(), 0);
    assert_eq!(store.del(&["never"]).await.unwrap(), 0);
    assert_eq!(store.get("a").await.unwrap(), None);
}

#[tokio::test]
async fn test_exists() {
    let store = store().await;
    store.set("a", &json!(1), SetOptions::default()).await.unwrap();
    store.set("gone", &json!(1), SetOptions::ex(0)).await.unwrap();

    assert_eq!(store.exists(&["a", "gone", "never"]).await.unwrap(), 1);
    assert_eq!(store.exists(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_keys_glob_matching() {
    let store = store().await;
    for key in ["k1", "k2", "k10", "other"] {
        store.set(key, &json!(0), SetOptions::default()).await.unwrap();
    }

    assert_eq!(sorted_keys(&store, "k?").await, vec!["k1", "k2"]);
    assert_eq!(sorted_keys(&store, "k*").await, vec!["k1", "k10", "k2"]);
    assert_eq!(sorted_keys(&store, "*").await.len(), 4);
    assert!(sorted_keys(&store, "K*").await.is_empty());
}

#[tokio::test]
async fn test_keys_with_literal_special_characters() {
    let store = store().await;
    for key in ["user_1", "userx1", "100%", "1000", "dir\\file"] {
        store.set(key, &json!(0), SetOptions::default()).await.unwrap();
    }

    assert_eq!(sorted_keys(&store, "user_?").await, vec!["user_1"]);
    assert_eq!(sorted_keys(&store, "user?1").await, vec!["user_1", "userx1"]);
    assert_eq!(sorted_keys(&store, "100%").await, vec!["100%"]);
    assert_eq!(sorted_keys(&store, "dir\\*").await, vec!["dir\\file"]);
}

#[tokio::test]
async fn test_keys_skips_expired() {
    let store = store().await;
    store.set("session:1", &json!(1), SetOptions::default()).await.unwrap();
    store.set("session:2", &json!(2), SetOptions::ex(0)).await.unwrap();

    assert_eq!(sorted_keys(&store, "session:*").await, vec!["session:1"]);
}

#[tokio::test]
async fn test_expiry_and_ttl() {
    let store = store().await;

    store.set("gone", &json!("v"), SetOptions::ex(0)).await.unwrap();
    assert_eq!(store.get("gone").await.unwrap(), None);
    assert_eq!(store.ttl("gone").await.unwrap(), -2);

    store.set("forever", &json!("v"), SetOptions::default()).await.unwrap();
    assert_eq!(store.ttl("forever").await.unwrap(), -1);

    store.set("soon", &json!("v"), SetOptions::ex(100)).await.unwrap();
    let ttl = store.ttl("soon").await.unwrap();
    assert!((99..=100).contains(&ttl), "ttl was {}", ttl);

    assert_eq!(store.ttl("never").await.unwrap(), -2);
}

#[tokio::test]
async fn test_expire_and_persist() {
    let store = store().await;
    store.set("k", &json!(1), SetOptions::default()).await.unwrap();

    assert!(store.expire("k", 50).await.unwrap());
    let ttl = store.ttl("k").await.unwrap();
    assert!((49..=50).contains(&ttl), "ttl was {}", ttl);

    assert!(store.persist("k").await.unwrap());
    assert!(!store.persist("k").await.unwrap());
    assert_eq!(store.ttl("k").await.unwrap(), -1);

    assert!(store.expire("k", 0).await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), None);
    assert!(!store.expire("k", 10).await.unwrap());
    assert!(!store.expire("never", 10).await.unwrap());
}

#[tokio::test]
async fn test_incr_restarts_after_expiry() {
    let store = store().await;
    store.set("hits", &json!(10), SetOptions::ex(0)).await.unwrap();

    assert_eq!(store.incr("hits").await.unwrap(), 1);
    assert_eq!(store.ttl("hits").await.unwrap(), -1);
}

#[tokio::test]
async fn test_decr_from_absent() {
    let store = store().await;
    assert_eq!(store.decr("n").await.unwrap(), -1);
    assert_eq!(store.decr("n").await.unwrap(), -2);
}

#[tokio::test]
async fn test_incr_overflow_leaves_value() {
    let store = store().await;

    store.set("max", &json!(i64::MAX), SetOptions::default()).await.unwrap();
    let err = store.incr("max").await.unwrap_err();
    assert!(matches!(err, KvError::Command(CommandError::Overflow)));
    assert_eq!(store.get("max").await.unwrap(), Some(json!(i64::MAX)));
    assert_eq!(store.incr_by("max", -1).await.unwrap(), i64::MAX - 1);
    assert_eq!(store.incr("max").await.unwrap(), i64::MAX);

    store.set("min", &json!(i64::MIN + 1), SetOptions::default()).await.unwrap();
    assert_eq!(store.decr("min").await.unwrap(), i64::MIN);
    let err = store.decr_by("min", 1).await.unwrap_err();
    assert!(matches!(err, KvError::Command(CommandError::Overflow)));
    assert_eq!(store.get("min").await.unwrap(), Some(json!(i64::MIN)));

    let err = store.decr_by("other", i64::MIN).await.unwrap_err();
    assert!(matches!(err, KvError::Command(CommandError::Overflow)));
}

#[tokio::test]
async fn test_list_commands_reject_other_types() {
    let store = store().await;
    store.set("text", &json!("hello"), SetOptions::default()).await.unwrap();
    store.set("number", &json!(5), SetOptions::default()).await.unwrap();
    store.hset("hash", "f", &json!(1)).await.unwrap();

    for key in ["text", "number", "hash"] {
        assert!(is_wrong_type(store.lpush(key, &json!("x")).await), "lpush {}", key);
        assert!(is_wrong_type(store.rpush(key, &json!("x")).await), "rpush {}", key);
        assert!(is_wrong_type(store.lpop(key).await), "lpop {}", key);
        assert!(is_wrong_type(store.rpop(key).await), "rpop {}", key);
        assert!(is_wrong_type(store.lrange(key, 0, -1).await), "lrange {}", key);
        assert!(is_wrong_type(store.llen(key).await), "llen {}", key);
        assert!(is_wrong_type(store.lindex(key, 0).await), "lindex {}", key);
        assert!(is_wrong_type(store.lrem(key, 0, &json!("x")).await), "lrem {}", key);
    }

    assert_eq!(store.get("text").await.unwrap(), Some(json!("hello")));
    assert_eq!(store.get("number").await.unwrap(), Some(json!(5)));
    assert_eq!(store.hget("hash", "f").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_hash_commands_reject_other_types() {
    let store = store().await;
    store.set("text", &json!("hello"), SetOptions::default()).await.unwrap();
    store.set("number", &json!(5), SetOptions::default()).await.unwrap();
    store.rpush("list", &json!("a")).await.unwrap();

    for key in ["text", "number", "list"] {
        assert!(is_wrong_type(store.hset(key, "f", &json!(1)).await), "hset {}", key);
        assert!(is_wrong_type(store.hget(key, "f").await), "hget {}", key);
        assert!(is_wrong_type(store.hdel(key, "f").await), "hdel {}", key);
        assert!(is_wrong_type(store.hlen(key).await), "hlen {}", key);
        assert!(is_wrong_type(store.hgetall(key).await), "hgetall {}", key);
    }

    assert_eq!(store.get("text").await.unwrap(), Some(json!("hello")));
    assert_eq!(store.get("number").await.unwrap(), Some(json!(5)));
    assert_eq!(store.lrange("list", 0, -1).await.unwrap(), vec![json!("a")]);
}

#[tokio::test]
async fn test_expired_value_of_other_type_is_replaced() {
    let store = store().await;
    store.set("k", &json!("hello"), SetOptions::ex(0)).await.unwrap();
    assert_eq!(store.lpush("k", &json!(1)).await.unwrap(), 1);

    store.set("h", &json!([1, 2]), SetOptions::ex(0)).await.unwrap();
    assert!(store.hset("h", "f", &json!(1)).await.unwrap());
    assert_eq!(store.hlen("h").await.unwrap(), 1);
}

#[tokio::test]
async fn test_set_replaces_list_with_string() {
    let store = store().await;
    store.rpush("k", &json!(1)).await.unwrap();
    store.set("k", &json!("plain"), SetOptions::default()).await.unwrap();

    assert_eq!(store.get("k").await.unwrap(), Some(json!("plain")));
    assert!(is_wrong_type(store.llen("k").await));
}

#[tokio::test]
async fn test_push_and_range() {
    let store = store().await;

    assert_eq!(store.lpush("l", &json!(1)).await.unwrap(), 1);
    assert_eq!(store.lpush("l", &json!(2)).await.unwrap(), 2);
    assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec![json!(2), json!(1)]);

    assert_eq!(store.rpush("l", &json!("three")).await.unwrap(), 3);
    assert_eq!(
        store.lrange("l", 0, -1).await.unwrap(),
        vec![json!(2), json!(1), json!("three")]
    );
    assert_eq!(store.lrange("l", -2, -1).await.unwrap(), vec![json!(1), json!("three")]);
    assert_eq!(store.lrange("l", 1, 1).await.unwrap(), vec![json!(1)]);
    assert!(store.lrange("l", 5, 10).await.unwrap().is_empty());
    assert!(store.lrange("missing", 0, -1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_elements_keep_their_types() {
    let store = store().await;
    let elements = vec![
        json!(7),
        json!(1.5),
        json!("7"),
        json!(true),
        json!(null),
        json!({"nested": [1, 2]}),
    ];

    for element in &elements {
        store.rpush("typed", element).await.unwrap();
    }

    assert_eq!(store.lrange("typed", 0, -1).await.unwrap(), elements);
    assert_eq!(store.lindex("typed", 2).await.unwrap(), Some(json!("7")));
    assert_eq!(store.rpop("typed").await.unwrap(), Some(json!({"nested": [1, 2]})));
}

#[tokio::test]
async fn test_pops() {
    let store = store().await;
    list_of(&store, "q", &["a", "b", "c"]).await;

    assert_eq!(store.lpop("q").await.unwrap(), Some(json!("a")));
    assert_eq!(store.rpop("q").await.unwrap(), Some(json!("c")));
    assert_eq!(store.llen("q").await.unwrap(), 1);
    assert_eq!(store.rpop("q").await.unwrap(), Some(json!("b")));

    assert_eq!(store.lpop("q").await.unwrap(), None);
    assert_eq!(store.rpop("q").await.unwrap(), None);
    assert_eq!(store.llen("q").await.unwrap(), 0);
    assert_eq!(store.lpop("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_llen_and_lindex() {
    let store = store().await;
    assert_eq!(store.llen("l").await.unwrap(), 0);

    list_of(&store, "l", &["a", "b", "c"]).await;
    assert_eq!(store.llen("l").await.unwrap(), 3);

    assert_eq!(store.lindex("l", 0).await.unwrap(), Some(json!("a")));
    assert_eq!(store.lindex("l", 2).await.unwrap(), Some(json!("c")));
    assert_eq!(store.lindex("l", -1).await.unwrap(), Some(json!("c")));
    assert_eq!(store.lindex("l", -3).await.unwrap(), Some(json!("a")));
    assert_eq!(store.lindex("l", 3).await.unwrap(), None);
    assert_eq!(store.lindex("missing", 0).await.unwrap(), None);
}

#[tokio::test]
async fn test_push_replaces_expired_list() {
    let store = store().await;
    list_of(&store, "l", &["old", "older"]).await;
    store.expire("l", 0).await.unwrap();

    assert_eq!(store.rpush("l", &json!("new")).await.unwrap(), 1);
    assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec![json!("new")]);
    assert_eq!(store.ttl("l").await.unwrap(), -1);
}

#[tokio::test]
async fn test_lrem() {
    let store = store().await;
    let elements = ["a", "b", "c", "b", "b", "a", "b", "c"];

    list_of(&store, "head", &elements).await;
    assert_eq!(store.lrem("head", 2, &json!("b")).await.unwrap(), 2);
    assert_eq!(
        store.lrange("head", 0, -1).await.unwrap(),
        vec![json!("a"), json!("c"), json!("b"), json!("a"), json!("b"), json!("c")]
    );

    list_of(&store, "tail", &elements).await;
    assert_eq!(store.lrem("tail", -1, &json!("a")).await.unwrap(), 1);
    assert_eq!(
        store.lrange("tail", 0, -1).await.unwrap(),
        vec![json!("a"), json!("b"), json!("c"), json!("b"), json!("b"), json!("b"), json!("c")]
    );

    list_of(&store, "all", &elements).await;
    assert_eq!(store.lrem("all", 0, &json!("c")).await.unwrap(), 2);
    assert_eq!(
        store.lrange("all", 0, -1).await.unwrap(),
        vec![json!("a"), json!("b"), json!("b"), json!("b"), json!("a"), json!("b")]
    );

    assert_eq!(store.lrem("all", 0, &json!("zzz")).await.unwrap(), 0);
    assert_eq!(store.lrem("missing", 0, &json!("a")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_lrem_compares_types() {
    let store = store().await;
    store.rpush("mixed", &json!(1)).await.unwrap();
    store.rpush("mixed", &json!("1")).await.unwrap();
    store.rpush("mixed", &json!(1)).await.unwrap();

    assert_eq!(store.lrem("mixed", 0, &json!("1")).await.unwrap(), 1);
    assert_eq!(store.lrange("mixed", 0, -1).await.unwrap(), vec![json!(1), json!(1)]);
}

#[tokio::test]
async fn test_hashes() {
    let store = store().await;

    assert!(store.hset("user:1", "name", &json!("ada")).await.unwrap());
    assert!(store.hset("user:1", "visits", &json!(3)).await.unwrap());
    assert!(!store.hset("user:1", "name", &json!("grace")).await.unwrap());

    assert_eq!(store.hget("user:1", "name").await.unwrap(), Some(json!("grace")));
    assert_eq!(store.hget("user:1", "visits").await.unwrap(), Some(json!(3)));
    assert_eq!(store.hget("user:1", "missing").await.unwrap(), None);
    assert_eq!(store.hget("user:2", "name").await.unwrap(), None);

    let all = store.hgetall("user:1").await.unwrap().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["name"], json!("grace"));
    assert_eq!(all["visits"], json!(3));
    assert_eq!(store.hgetall("user:2").await.unwrap(), None);
    assert_eq!(store.hlen("user:1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_hash_field_names_and_values() {
    let store = store().await;

    store.hset("h", "a.b", &json!([1, 2])).await.unwrap();
    store.hset("h", "say \"hi\"", &json!({"x": null})).await.unwrap();
    store.hset("h", "flag", &json!(false)).await.unwrap();

    assert_eq!(store.hget("h", "a.b").await.unwrap(), Some(json!([1, 2])));
    assert_eq!(store.hget("h", "say \"hi\"").await.unwrap(), Some(json!({"x": null})));
    assert_eq!(store.hget("h", "flag").await.unwrap(), Some(json!(false)));
}

#[tokio::test]
async fn test_hdel() {
    let store = store().await;
    store.hset("h", "a", &json!(1)).await.unwrap();
    store.hset("h", "b", &json!(2)).await.unwrap();

    assert!(store.hdel("h", "a").await.unwrap());
    assert!(!store.hdel("h", "a").await.unwrap());
    assert!(!store.hdel("missing", "a").await.unwrap());

    assert_eq!(store.hlen("h").await.unwrap(), 1);
    assert!(store.hdel("h", "b").await.unwrap());
    assert_eq!(store.hgetall("h").await.unwrap().map(|m| m.len()), Some(0));
}

#[tokio::test]
async fn test_hset_replaces_expired_hash() {
    let store = store().await;
    store.hset("h", "old", &json!(1)).await.unwrap();
    store.expire("h", 0).await.unwrap();

    assert_eq!(store.hgetall("h").await.unwrap(), None);
    assert!(store.hset("h", "new", &json!(2)).await.unwrap());

    let all = store.hgetall("h").await.unwrap().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all["new"], json!(2));
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let sessions = KvStore::new(Arc::clone(&backend), StoreConfig::new("sessions")).await.unwrap();
    let cache = KvStore::new(backend, StoreConfig::new("cache")).await.unwrap();

    sessions.set("k", &json!("session"), SetOptions::default()).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);

    cache.set("k", &json!("cache"), SetOptions::default()).await.unwrap();
    assert_eq!(sessions.get("k").await.unwrap(), Some(json!("session")));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        store: StoreConfig::new("persisted"),
        sqlite: SqliteConfig::file(dir.path().join("kv.sqlite3")),
    };

    {
        let store = KvStore::open(&config).await.unwrap();
        store.set("k", &json!({"kept": true}), SetOptions::default()).await.unwrap();
        store.rpush("l", &json!(1)).await.unwrap();
    }

    let store = KvStore::open(&config).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(json!({"kept": true})));
    assert_eq!(store.llen("l").await.unwrap(), 1);
}
