//! End-to-end SQL scenarios driven through the executor's public surface.

use std::io;

use fixdb::executor::Executor;
use fixdb::storage::FixedTable;
use tempfile::tempdir;

fn executor(dir: &std::path::Path) -> Executor {
    Executor::with_sink(Box::new(io::sink())).base_dir(dir)
}

fn run(ex: &mut Executor, sql: &str) -> String {
    ex.run_statement(sql)
        .unwrap_or_else(|e| panic!("statement '{}' failed: {}", sql, e))
        .render()
}

#[test]
fn test_create_insert_select() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (name CHAR(8), qty INT)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('a', 10)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('b', 20)");

    // the implicit id column is auto-assigned 1, 2
    assert_eq!(
        run(&mut ex, "SELECT * FROM t"),
        "id | name | qty\n1 | a | 10\n2 | b | 20\n(filas: 2)\n"
    );
}

#[test]
fn test_index_range_select() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (name CHAR(8), qty INT)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('a', 10)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('b', 20)");
    run(&mut ex, "CREATE INDEX ix_q ON t (qty)");

    assert_eq!(
        run(&mut ex, "SELECT name FROM t WHERE qty >= 15 AND qty <= 30"),
        "name\nb\n(filas: 1)\n"
    );
}

#[test]
fn test_delete_and_reselect() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (name CHAR(8), qty INT)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('a', 10)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('b', 20)");
    run(&mut ex, "CREATE INDEX ix_q ON t (qty)");

    assert_eq!(run(&mut ex, "DELETE FROM t WHERE qty == 10"), "(filas borradas: 1)\n");
    assert_eq!(
        run(&mut ex, "SELECT * FROM t"),
        "id | name | qty\n2 | b | 20\n(filas: 1)\n"
    );

    // both deletion signals are visible on disk: the tombstone byte and
    // the in-row id = -1 marker
    let tbl_path = dir.path().join("db1").join("t").join("t.tbl");
    let del = std::fs::read(dir.path().join("db1").join("t").join("t.tbl.del")).unwrap();
    assert_ne!(del[0], 0);
    assert_eq!(del[1], 0);

    let mut table = FixedTable::open(&tbl_path).unwrap();
    assert_eq!(table.read_int(0, "id").unwrap(), -1);
}

#[test]
fn test_update_crosses_index() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (name CHAR(8), qty INT)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('a', 10)");
    run(&mut ex, "INSERT INTO t (name, qty) VALUES ('b', 20)");
    run(&mut ex, "CREATE INDEX ix_q ON t (qty)");

    assert_eq!(
        run(&mut ex, "UPDATE t SET qty = 25 WHERE name == 'b'"),
        "(filas actualizadas: 1)\n"
    );
    // the new value is reachable through the index probe
    assert_eq!(
        run(&mut ex, "SELECT * FROM t WHERE qty == 25"),
        "id | name | qty\n2 | b | 25\n(filas: 1)\n"
    );
    // and the old key is gone
    assert_eq!(
        run(&mut ex, "SELECT * FROM t WHERE qty == 20"),
        "id | name | qty\n(filas: 0)\n"
    );
}

#[test]
fn test_persistence_across_sessions() {
    let dir = tempdir().unwrap();
    {
        let mut ex = executor(dir.path());
        run(&mut ex, "CREATE DATABASE db1");
        run(&mut ex, "USE db1");
        run(&mut ex, "CREATE TABLE t (name CHAR(8), qty INT)");
        run(&mut ex, "INSERT INTO t (name, qty) VALUES ('a', 10)");
        run(&mut ex, "INSERT INTO t (name, qty) VALUES ('b', 20)");
        run(&mut ex, "CREATE INDEX ix_q ON t (qty)");
        run(&mut ex, "UPDATE t SET qty = 25 WHERE name == 'b'");
        run(&mut ex, "CLOSE");
    }

    // a brand-new session sees the same data through the same probe
    let mut ex = executor(dir.path());
    run(&mut ex, "USE db1");
    assert_eq!(
        run(&mut ex, "SELECT * FROM t WHERE qty == 25"),
        "id | name | qty\n2 | b | 25\n(filas: 1)\n"
    );
}

#[test]
fn test_show_tables_lists_on_disk_tables() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE beta (qty INT)");
    run(&mut ex, "CREATE TABLE alfa (qty INT)");

    assert_eq!(
        run(&mut ex, "SHOW TABLES"),
        "table\nalfa\nbeta\n(filas: 2)\n"
    );
}

#[test]
fn test_delete_then_insert_reuses_physical_count_ids() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (name CHAR(8))");
    run(&mut ex, "INSERT INTO t (name) VALUES ('a')");
    run(&mut ex, "INSERT INTO t (name) VALUES ('b')");
    run(&mut ex, "DELETE FROM t WHERE name == 'b'");

    // the next id comes from the physical count, so page id 2 gets id 3
    run(&mut ex, "INSERT INTO t (name) VALUES ('c')");
    assert_eq!(
        run(&mut ex, "SELECT * FROM t"),
        "id | name\n1 | a\n3 | c\n(filas: 2)\n"
    );
}

#[test]
fn test_float_column_round_trip() {
    let dir = tempdir().unwrap();
    let mut ex = executor(dir.path());

    run(&mut ex, "CREATE DATABASE db1");
    run(&mut ex, "USE db1");
    run(&mut ex, "CREATE TABLE t (price FLOAT)");
    run(&mut ex, "INSERT INTO t (price) VALUES (2.5)");
    run(&mut ex, "INSERT INTO t (price) VALUES (10)");
    run(&mut ex, "CREATE INDEX ix_p ON t (price)");

    assert_eq!(
        run(&mut ex, "SELECT price FROM t WHERE price > 2.5"),
        "price\n10\n(filas: 1)\n"
    );
    assert_eq!(
        run(&mut ex, "SELECT price FROM t WHERE price >= 2.5"),
        "price\n2.5\n10\n(filas: 2)\n"
    );
}
