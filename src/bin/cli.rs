//! fixdb - CLI client
//!
//! A line-oriented REPL over the SQL executor. Each line is one
//! statement; `.quit` exits.

use std::io::{self, BufRead, Write};

use fixdb::executor::Executor;

fn print_banner() {
    println!(
        r#"fixdb - an embedded fixed-width relational mini-database
Type SQL statements, one per line. '.quit' to exit.
"#
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    print_banner();
    let mut executor = Executor::new();

    let stdin = io::stdin();
    loop {
        print!("fixdb> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("input error: {}", e);
                break;
            }
        }

        let line = line.trim();
        if line == ".quit" || line == ".exit" {
            break;
        }
        executor.execute(line);
    }
}
