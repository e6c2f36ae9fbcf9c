//! The literal end-to-end scenarios (S1-S6): one `Database` per scenario,
//! driven entirely through the public statement-execution API.

use relite::buffer_pool::ReplacementPolicy;
use relite::value::Value;
use relite::{parser, Config, Database, StatementOutcome};

fn fresh_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        buffer_capacity: 16,
        replacement_policy: ReplacementPolicy::Lru,
        pushdown: true,
    };
    (Database::open(&config).unwrap(), dir)
}

fn run(db: &mut Database, src: &str) -> Vec<Result<StatementOutcome, relite::DbError>> {
    parser::parse_statements(src)
        .into_iter()
        .map(|r| match r {
            Ok(stmt) => db.execute(&stmt),
            Err(e) => Err(e),
        })
        .collect()
}

#[test]
fn s1_duplicate_primary_key_is_rejected_first_row_survives() {
    let (mut db, _dir) = fresh_db();
    let results = run(
        &mut db,
        "CREATE TABLE t(id INT PRIMARY KEY, n VARCHAR(4)); \
         INSERT INTO t VALUES (1,'ab'); \
         INSERT INTO t VALUES (1,'cd'); \
         SELECT * FROM t;",
    );
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());
    match results[3].as_ref().unwrap() {
        StatementOutcome::Rows(r) => {
            assert_eq!(r.rows, vec![vec![Value::Int(1), Value::Varchar("ab".into())]]);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn s2_varchar_length_violation_leaves_table_empty() {
    let (mut db, _dir) = fresh_db();
    let results = run(
        &mut db,
        "CREATE TABLE d(id INT PRIMARY KEY, s VARCHAR(8)); \
         INSERT INTO d VALUES (1,'Engineering'); \
         SELECT * FROM d;",
    );
    assert!(results[1].is_err());
    match results[2].as_ref().unwrap() {
        StatementOutcome::Rows(r) => assert_eq!(r.rows.len(), 0),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn s3_filters_on_age() {
    let (mut db, _dir) = fresh_db();
    let results = run(
        &mut db,
        "CREATE TABLE students(id INT PRIMARY KEY, name VARCHAR(16), age INT); \
         INSERT INTO students VALUES (1,'Alice',20); \
         INSERT INTO students VALUES (2,'Bob',22); \
         INSERT INTO students VALUES (3,'Cindy',20); \
         SELECT name, age FROM students WHERE age > 20;",
    );
    match results.last().unwrap().as_ref().unwrap() {
        StatementOutcome::Rows(r) => {
            assert_eq!(r.rows, vec![vec![Value::Varchar("Bob".into()), Value::Int(22)]]);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn s4_inner_join_matches_by_id() {
    let (mut db, _dir) = fresh_db();
    let results = run(
        &mut db,
        "CREATE TABLE students(id INT PRIMARY KEY, name VARCHAR(16), age INT); \
         CREATE TABLE courses(cid INT PRIMARY KEY, cname VARCHAR(16)); \
         INSERT INTO students VALUES (1,'Alice',20); \
         INSERT INTO students VALUES (2,'Bob',22); \
         INSERT INTO students VALUES (3,'Cindy',20); \
         INSERT INTO courses VALUES (1,'CS'); \
         INSERT INTO courses VALUES (2,'OS'); \
         SELECT s.name, c.cname FROM students s JOIN courses c ON s.id = c.cid;",
    );
    match results.last().unwrap().as_ref().unwrap() {
        StatementOutcome::Rows(r) => {
            assert_eq!(
                r.rows,
                vec![
                    vec![Value::Varchar("Alice".into()), Value::Varchar("CS".into())],
                    vec![Value::Varchar("Bob".into()), Value::Varchar("OS".into())],
                ]
            );
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn s5_group_by_age_order_by_age_desc() {
    let (mut db, _dir) = fresh_db();
    let results = run(
        &mut db,
        "CREATE TABLE students(id INT PRIMARY KEY, name VARCHAR(16), age INT); \
         INSERT INTO students VALUES (1,'Alice',20); \
         INSERT INTO students VALUES (2,'Bob',22); \
         INSERT INTO students VALUES (3,'Cindy',20); \
         SELECT age, COUNT(*) FROM students GROUP BY age ORDER BY age DESC;",
    );
    match results.last().unwrap().as_ref().unwrap() {
        StatementOutcome::Rows(r) => {
            assert_eq!(r.rows, vec![vec![Value::Int(22), Value::Int(1)], vec![Value::Int(20), Value::Int(2)]]);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn s6_join_without_on_is_a_parse_hint() {
    let results = parser::parse_statements("SELECT s.id FROM student s JOIN class c;");
    assert_eq!(results.len(), 1);
    let err = results[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("after JOIN expected ON"));
}
