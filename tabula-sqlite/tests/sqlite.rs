mod common;

#[cfg(test)]
mod tests {
    use crate::common::{TempDb, init_logs};
    use crate::silent_logs;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };
    use tabula::{DbError, Record, params, query_set};
    use tabula_sqlite::{SqliteDatabase, SqliteError};

    const TTL: Duration = Duration::from_secs(3600);

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Everything {
        id: Option<isize>,
        small_unsigned: usize,
        tiny_unsigned: u8,
        short_unsigned: u16,
        int_signed: i32,
        int_unsigned: u32,
        big_signed: i64,
        big_unsigned: u64,
        single: f32,
        double: f64,
        bytes: Vec<u8>,
        label: String,
        tags: Vec<String>,
        enabled: Option<bool>,
        tiny_signed: Option<i8>,
        elapsed: Duration,
        short_signed: i16,
    }

    fn open(file: &TempDb) -> SqliteDatabase {
        let db = SqliteDatabase::new(file.path.clone());
        db.open(TTL).expect("Could not open the database");
        db
    }

    #[test]
    fn round_trip() {
        init_logs();
        let file = TempDb::new("round_trip");
        let db = open(&file);
        db.create::<Everything>("test", &[])
            .expect("Could not create the table");
        let value = Everything {
            id: Some(2),
            small_unsigned: usize::try_from(i64::MAX - 1).unwrap_or(usize::MAX),
            tiny_unsigned: u8::MAX,
            short_unsigned: u16::MAX,
            int_signed: i32::MIN,
            int_unsigned: u32::MAX,
            big_signed: i64::MIN,
            big_unsigned: i64::MAX as u64,
            single: f32::MIN_POSITIVE,
            double: f64::MIN_POSITIVE,
            bytes: vec![1, 0, 3],
            label: "123 ünïcode".into(),
            tags: vec!["123".into(), "456".into()],
            enabled: Some(true),
            tiny_signed: None,
            elapsed: Duration::from_secs(1),
            short_signed: -32768,
        };
        db.insert("test", &value).expect("Could not insert");

        let mut found = Everything {
            tiny_signed: Some(2),
            ..Default::default()
        };
        db.find("test", &mut found, "WHERE id = ?", &params![2])
            .expect("Could not find");
        assert_eq!(
            found,
            Everything {
                tags: vec!["123".into()],
                ..value.clone()
            }
        );

        // Autoincrement of a nullable integer primary key
        let result = db
            .insert(
                "test",
                &Everything {
                    tags: vec!["".into()],
                    ..Default::default()
                },
            )
            .expect("Could not insert");
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_affected_id, Some(3));
        let (condition, params) = query_set("WHERE id", "IN", [3]).expect("Could not build the set");
        let found: Everything = db
            .find_as("test", &condition, &params)
            .expect("Could not find");
        assert_eq!(found.id, Some(3));
        assert_eq!(found.tags, [""]);
        assert_eq!(found.bytes, Vec::<u8>::new());
        assert_eq!(found.enabled, None);

        // An empty text sequence is stored as NULL
        let value = Everything {
            id: Some(4),
            tiny_signed: Some(i8::MIN),
            enabled: Some(false),
            double: -0.1,
            elapsed: Duration::from_nanos(i64::MAX as u64),
            tags: vec![],
            ..Default::default()
        };
        db.insert("test", &value).expect("Could not insert");
        assert!(db.can_find("test", "WHERE id = ? AND tags IS NULL", &params![4]));
        let found: Everything = db
            .find_as("test", "WHERE id = ?", &params![4])
            .expect("Could not find");
        assert_eq!(found, value);
        let mut tags = Vec::new();
        let mut found = Everything::default();
        db.find_for("test", &mut found, "ORDER BY id", &[], |found| {
            tags.push(found.tags.clone());
            Ok(())
        })
        .expect("Could not iterate");
        assert_eq!(
            tags,
            [vec!["123".to_string()], vec!["".to_string()], vec![]]
        );
        let all: Vec<Everything> = db
            .find_all("test", "WHERE tags IS NULL", &[])
            .expect("Could not find all");
        assert_eq!(all, [value]);
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Counter {
        id: Option<isize>,
        #[tabula(extra = "UNIQUE")]
        unique_count: u32,
    }

    #[test]
    fn insert_and_insert_unique() {
        init_logs();
        let file = TempDb::new("insert_unique");
        let db = open(&file);
        db.create::<Counter>("counter", &[])
            .expect("Could not create the table");
        db.insert(
            "counter",
            &Counter {
                id: Some(1),
                unique_count: 1,
            },
        )
        .expect("Could not insert");

        // Same primary key
        let error = silent_logs! {
            db.insert_unique("counter", &Counter { id: Some(1), unique_count: 2 })
                .expect_err("The primary key already exists")
        };
        let sqlite = SqliteError::of(&error).expect("Expected an engine error");
        assert!(sqlite.is_constraint_violation(), "{:?}", sqlite);

        // Same unique column
        let error = silent_logs! {
            db.insert_unique("counter", &Counter { id: Some(2), unique_count: 1 })
                .expect_err("The unique value already exists")
        };
        assert!(SqliteError::of(&error).is_some_and(SqliteError::is_constraint_violation));

        // The upsert overwrites
        db.insert(
            "counter",
            &Counter {
                id: Some(1),
                unique_count: 7,
            },
        )
        .expect("Could not replace");
        assert_eq!(db.count("counter").expect("Could not count"), 1);
        let found: Counter = db
            .find_as("counter", "WHERE id = ?", &params![1])
            .expect("Could not find");
        assert_eq!(found.unique_count, 7);

        db.insert_unique(
            "counter",
            &Counter {
                id: Some(2),
                unique_count: 8,
            },
        )
        .expect("Could not insert a new row");
        assert_eq!(db.count("counter").expect("Could not count"), 2);
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: String,
        score: i32,
    }

    fn items(db: &SqliteDatabase) {
        db.create::<Item>("items", &[])
            .expect("Could not create the table");
        for (id, name, score) in [(1, "one", 10), (2, "two", 20), (3, "three", 30)] {
            db.insert(
                "items",
                &Item {
                    id,
                    name: name.into(),
                    score,
                },
            )
            .expect("Could not insert");
        }
    }

    #[test]
    fn find_last_row_and_null_result() {
        init_logs();
        let file = TempDb::new("find_last_row");
        let db = open(&file);
        items(&db);

        let mut item = Item::default();
        db.find("items", &mut item, "WHERE score > ? ORDER BY id", &params![5])
            .expect("Could not find");
        assert_eq!(item.name, "three", "The last row wins");
        db.find(
            "items",
            &mut item,
            "WHERE score > ? ORDER BY id DESC",
            &params![5],
        )
        .expect("Could not find");
        assert_eq!(item.name, "one");

        let error = db
            .find("items", &mut item, "WHERE score > ?", &params![100])
            .expect_err("Nothing matches");
        assert_eq!(DbError::of(&error), Some(DbError::NullResult));
        assert_eq!(item.name, "one", "The record is left untouched");

        let error = db
            .find_all::<Item>("items", "WHERE name = ?", &params!["four"])
            .expect_err("Nothing matches");
        assert_eq!(DbError::of(&error), Some(DbError::NullResult));
        let error = db
            .query_as::<Item>("SELECT * FROM items WHERE id < 0;", &[])
            .expect_err("Nothing matches");
        assert_eq!(DbError::of(&error), Some(DbError::NullResult));

        assert!(db.can_find("items", "WHERE name = ?", &params!["two"]));
        assert!(!db.can_find("items", "WHERE name = ?", &params!["four"]));
        assert!(db.can_query("SELECT * FROM items;", &[]));
        silent_logs! {
            assert!(!db.can_query("SELECT * FROM nowhere;", &[]));
            assert!(!db.can_find("items", "WHERE", &[]));
        };
    }

    #[test]
    fn find_for_and_query() {
        init_logs();
        let file = TempDb::new("find_for");
        let db = open(&file);
        items(&db);

        let mut item = Item::default();
        let mut names = Vec::new();
        db.find_for("items", &mut item, "ORDER BY id", &[], |item| {
            names.push(item.name.clone());
            Ok(())
        })
        .expect("Could not iterate");
        assert_eq!(names, ["one", "two", "three"]);

        let mut seen = 0;
        let error = db
            .find_for("items", &mut item, "ORDER BY id", &[], |_| {
                seen += 1;
                if seen == 2 {
                    return Err(tabula::Error::msg("stop"));
                }
                Ok(())
            })
            .expect_err("The callback error is returned");
        assert_eq!(error.to_string(), "stop");
        assert_eq!(seen, 2);
        assert_eq!(item.name, "two");

        let all: Vec<Item> = db
            .query_all("SELECT * FROM items WHERE score >= ? ORDER BY score DESC;", &params![20])
            .expect("Could not query");
        assert_eq!(
            all.iter().map(|v| v.id).collect::<Vec<_>>(),
            [3, 2],
            "Rows keep their order"
        );

        let mut total = 0;
        db.query_for(
            "SELECT * FROM items;",
            &mut item,
            &[],
            |item| {
                total += item.score;
                Ok(())
            },
        )
        .expect("Could not query");
        assert_eq!(total, 60);

        db.query("SELECT * FROM items WHERE id = ?;", &mut item, &params![1])
            .expect("Could not query");
        assert_eq!(item.name, "one");

        let mut item = Item::default();
        db.pick("items", &mut item).expect("Could not pick");
        assert!((1..=3).contains(&item.id));
        let mut picked = Vec::new();
        db.pick_for("items", 2, &mut item, |item| {
            picked.push(item.id);
            Ok(())
        })
        .expect("Could not pick");
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);

        let result = db
            .delete("items", "WHERE id = ?", &params![2])
            .expect("Could not delete");
        assert_eq!(result.rows_affected, 1);
        assert_eq!(db.count("items").expect("Could not count"), 2);
        db.delete("items", "", &[]).expect("Could not delete");
        assert_eq!(db.count("items").expect("Could not count"), 0);
    }

    #[test]
    fn callback_issuing_queries() {
        init_logs();
        let file = TempDb::new("callback_queries");
        let db = open(&file);
        items(&db);

        let mut item = Item::default();
        let mut pairs = Vec::new();
        db.find_for("items", &mut item, "ORDER BY id", &[], |outer| {
            // The same statement is running, a transient one is compiled
            let mut inner = Item::default();
            db.find_for("items", &mut inner, "ORDER BY id", &[], |inner| {
                pairs.push((outer.id, inner.id));
                Ok(())
            })?;
            let copy: Item = db.find_as("items", "WHERE id = ?", &params![outer.id])?;
            assert_eq!(&copy, outer);
            Ok(())
        })
        .expect("Could not iterate");
        assert_eq!(pairs.len(), 9);
        assert_eq!(pairs[3], (2, 1));
    }

    #[test]
    fn list_tables() {
        init_logs();
        let file = TempDb::new("list_tables");
        let db = open(&file);
        assert!(db.list_tables().expect("Could not list").is_empty());
        for table in ["b", "a", "10x"] {
            db.create::<Item>(table, &[])
                .expect("Could not create the table");
        }
        assert_eq!(
            db.list_tables().expect("Could not list the tables"),
            ["10x", "a", "b"]
        );
        db.insert(
            "10x",
            &Item {
                id: 1,
                name: "digit".into(),
                score: 0,
            },
        )
        .expect("Could not insert in a digit led table");
        assert_eq!(db.count("10x").expect("Could not count"), 1);
    }

    #[test]
    fn count_drop_create() {
        init_logs();
        let file = TempDb::new("count_drop_create");
        let db = open(&file);
        db.create::<Item>("items", &[])
            .expect("Could not create the table");
        for id in 0..25 {
            db.insert(
                "items",
                &Item {
                    id,
                    ..Default::default()
                },
            )
            .expect("Could not insert");
        }
        assert_eq!(db.count("items").expect("Could not count"), 25);
        db.create::<Item>("items", &[])
            .expect("Creating twice is not an error");
        assert_eq!(db.count("items").expect("Could not count"), 25);
        db.drop_table("items").expect("Could not drop");
        silent_logs! {
            assert!(db.count("items").is_err());
        };
        db.create::<Item>("items", &[])
            .expect("Could not create the table again");
        assert_eq!(db.count("items").expect("Could not count"), 0);
    }

    #[derive(Record, Default)]
    struct Teacher {
        id: Option<isize>,
        name: String,
    }

    #[derive(Record, Default)]
    struct Class {
        id: Option<isize>,
        teacher_id: i64,
        student_count: u32,
    }

    #[test]
    fn foreign_key() {
        init_logs();
        let file = TempDb::new("foreign_key");
        let db = open(&file);
        db.create::<Teacher>("teacher", &[])
            .expect("Could not create the table");
        for name in ["Anna", "Bob", "Catalina", "Donald", "Emily"] {
            db.insert(
                "teacher",
                &Teacher {
                    id: None,
                    name: name.into(),
                },
            )
            .expect("Could not insert");
        }
        db.execute("PRAGMA foreign_keys = ON;", &[])
            .expect("Could not enable the foreign keys");
        db.create::<Class>(
            "class",
            &["FOREIGN KEY(teacher_id) REFERENCES teacher(id)"],
        )
        .expect("Could not create the table");
        for (teacher_id, student_count) in [(4, 66), (3, 55), (2, 44), (1, 33), (5, 22)] {
            db.insert(
                "class",
                &Class {
                    id: None,
                    teacher_id,
                    student_count,
                },
            )
            .expect("Could not insert");
        }
        let error = silent_logs! {
            db.insert("class", &Class { id: None, teacher_id: 6, student_count: 11 })
                .expect_err("The teacher does not exist")
        };
        assert!(SqliteError::of(&error).is_some_and(SqliteError::is_constraint_violation));
        assert_eq!(db.count("class").expect("Could not count"), 5);
    }

    #[derive(Record, Debug, Default)]
    struct Count {
        id: Option<isize>,
        count: u32,
    }

    #[test]
    fn update_all_found() {
        init_logs();
        let file = TempDb::new("update_all_found");
        let db = open(&file);
        db.create::<Count>("counter", &[])
            .expect("Could not create the table");
        for i in 1..=128 {
            db.insert(
                "counter",
                &Count {
                    id: None,
                    count: i,
                },
            )
            .expect("Could not insert");
        }
        let counters: Vec<Count> = db
            .find_all("counter", "", &[])
            .expect("Could not find all");
        assert_eq!(counters.len(), 128);
        for mut counter in counters {
            counter.count += 10000;
            db.insert("counter", &counter).expect("Could not update");
        }
        for i in 1..=128 {
            let counter: Count = db
                .find_as("counter", "WHERE id = ?", &params![i])
                .expect("Could not find");
            assert_eq!(counter.count, i as u32 + 10000);
        }
        assert_eq!(db.count("counter").expect("Could not count"), 128);
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Wider {
        id: i64,
        name: String,
        score: i32,
        extra: String,
    }

    #[test]
    fn insert_uses_live_columns() {
        init_logs();
        let file = TempDb::new("live_columns");
        let db = open(&file);
        items(&db);
        let wider = Wider {
            id: 9,
            name: "nine".into(),
            score: 90,
            extra: "more".into(),
        };
        let error = silent_logs! {
            db.insert("items", &wider).expect_err("The table has fewer columns")
        };
        assert!(format!("{:#}", error).contains("3 columns"));

        db.execute("ALTER TABLE items ADD COLUMN extra TEXT NOT NULL DEFAULT '';", &[])
            .expect("Could not alter the table");
        db.insert("items", &wider)
            .expect("The column list follows the live schema");
        let found: Wider = db
            .find_as("items", "WHERE id = ?", &params![9])
            .expect("Could not find");
        assert_eq!(found, wider);
    }

    #[test]
    fn not_initialized() {
        init_logs();
        let file = TempDb::new("not_initialized");
        let db = SqliteDatabase::new(file.path.clone());
        assert!(!db.is_open());
        let error = db.count("items").expect_err("The database is not open");
        assert_eq!(DbError::of(&error), Some(DbError::NotInitialized));
        assert!(!db.can_query("SELECT 1;", &[]));
        db.close().expect("Closing a closed database does nothing");

        db.open(TTL).expect("Could not open the database");
        db.open(TTL).expect("Opening twice does nothing");
        assert!(db.is_open());
        items(&db);
        assert_eq!(db.count("items").expect("Could not count"), 3);
        db.close().expect("Could not close the database");
        assert!(!db.is_open());

        let mut item = Item::default();
        let error = db
            .find("items", &mut item, "", &[])
            .expect_err("The database is closed");
        assert_eq!(DbError::of(&error), Some(DbError::NotInitialized));
        let error = db.list_tables().expect_err("The database is closed");
        assert_eq!(DbError::of(&error), Some(DbError::NotInitialized));
        db.close().expect("Closing twice does nothing");

        db.open(TTL).expect("Could not reopen the database");
        assert_eq!(db.count("items").expect("Could not count"), 3);
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Score {
        id: i64,
        score: u8,
    }

    #[test]
    fn scan_failure_stops_the_loop() {
        init_logs();
        let file = TempDb::new("scan_failure");
        let db = open(&file);
        db.create::<Score>("scores", &[])
            .expect("Could not create the table");
        for (id, score) in [(1, 7), (2, 300), (3, 9)] {
            db.execute(
                "INSERT INTO scores (id, score) VALUES (?, ?);",
                &params![id, score],
            )
            .expect("Could not insert");
        }

        let mut score = Score::default();
        let mut seen = Vec::new();
        let error = db
            .find_for("scores", &mut score, "ORDER BY id", &[], |score| {
                seen.push(score.clone());
                Ok(())
            })
            .expect_err("300 does not fit the record");
        let message = format!("{:#}", error);
        assert!(message.contains("out of range"), "{}", message);
        assert!(message.contains("column 1"), "{}", message);
        assert_eq!(seen, [Score { id: 1, score: 7 }], "Called for the first row only");
        assert_eq!(
            score,
            Score { id: 2, score: 7 },
            "The columns before the failure are scanned"
        );

        let mut score = Score::default();
        assert!(
            db.find("scores", &mut score, "ORDER BY id", &[])
                .is_err(),
            "The third row is never reached"
        );
        assert!(
            db.find_all::<Score>("scores", "", &[]).is_err(),
            "No partial list"
        );
        db.find("scores", &mut score, "WHERE id <> ? ORDER BY id", &params![2])
            .expect("The other rows fit");
        assert_eq!(score, Score { id: 3, score: 9 });
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Base {
        id: i64,
        created: u64,
    }

    #[derive(Record, Debug, Default, Clone, PartialEq)]
    struct Note {
        #[tabula(flatten)]
        base: Base,
        #[tabula(name = "body")]
        text: String,
    }

    #[test]
    fn flatten_base_record() {
        init_logs();
        let file = TempDb::new("flatten");
        let db = open(&file);
        db.create::<Note>("notes", &[])
            .expect("Could not create the table");
        let note = Note {
            base: Base { id: 1, created: 77 },
            text: "hello".into(),
        };
        db.insert("notes", &note).expect("Could not insert");
        let found: Note = db
            .find_as("notes", "WHERE id = ? AND body = ?", &params![1, "hello"])
            .expect("Could not find");
        assert_eq!(found, note);
    }

    #[test]
    fn concurrent_access() {
        init_logs();
        let file = TempDb::new("concurrent");
        let db = Arc::new(open(&file));
        db.create::<Item>("items", &[])
            .expect("Could not create the table");
        let found = Arc::new(AtomicUsize::new(0));
        let threads = (0..8)
            .map(|t| {
                let db = db.clone();
                let found = found.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let id = t * 100 + i;
                        db.insert(
                            "items",
                            &Item {
                                id,
                                name: format!("item {}", id),
                                score: i as i32,
                            },
                        )
                        .expect("Could not insert");
                        let item: Item = db
                            .find_as("items", "WHERE id = ?", &params![id])
                            .expect("Could not find");
                        assert_eq!(item.name, format!("item {}", id));
                        found.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect::<Vec<_>>();
        for thread in threads {
            thread.join().expect("Thread panicked");
        }
        assert_eq!(found.load(Ordering::Relaxed), 200);
        assert_eq!(db.count("items").expect("Could not count"), 200);
        db.close().expect("Could not close the database");
    }

    #[test]
    fn concurrent_inserted_ids() {
        init_logs();
        let file = TempDb::new("concurrent_ids");
        let db = Arc::new(open(&file));
        db.create::<Count>("counter", &[])
            .expect("Could not create the table");
        let threads = (0..8u32)
            .map(|t| {
                let db = db.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let count = t * 1000 + i;
                        let result = db
                            .insert("counter", &Count { id: None, count })
                            .expect("Could not insert");
                        assert_eq!(result.rows_affected, 1);
                        let id = result.last_affected_id.expect("Expected the row id");
                        let found: Count = db
                            .find_as("counter", "WHERE id = ?", &params![id])
                            .expect("Could not find");
                        assert_eq!(found.count, count, "The id of this insert is reported");
                    }
                })
            })
            .collect::<Vec<_>>();
        for thread in threads {
            thread.join().expect("Thread panicked");
        }
        assert_eq!(db.count("counter").expect("Could not count"), 200);
    }
}
