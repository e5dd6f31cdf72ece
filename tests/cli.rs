use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ADMIN: &str = "admin@example.com";

struct Books {
    dir: TempDir,
}

impl Books {
    fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Initialized data dir with a signed-in admin, a cash account (101) and a sales account (401).
    fn new() -> Self {
        let books = Self::empty();
        books
            .run(&[
                "init",
                "--email",
                ADMIN,
                "--name",
                "Admin",
                "--company",
                "Acme Consulting",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed in as admin@example.com (admin)"));
        books
            .run(&["accounts", "add", "Cash", "--type", "Asset"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added account: 101 Cash (Asset)"));
        books
            .run(&["accounts", "add", "Sales", "--type", "Revenue"])
            .assert()
            .success()
            .stdout(predicate::str::contains("401 Sales"));
        books
    }

    fn command(&self, user: Option<&str>) -> Command {
        let mut cmd = Command::cargo_bin("ledgerly").unwrap();
        cmd.env("LEDGERLY_CONFIG_DIR", self.dir.path().join("config"))
            .env("LEDGERLY_DATA_DIR", self.dir.path().join("data"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        match user {
            Some(email) => cmd.env("LEDGERLY_USER", email),
            None => cmd.env_remove("LEDGERLY_USER"),
        };
        cmd
    }

    fn run(&self, args: &[&str]) -> Command {
        let mut cmd = self.command(None);
        cmd.args(args);
        cmd
    }

    fn run_as(&self, user: &str, args: &[&str]) -> Command {
        let mut cmd = self.command(Some(user));
        cmd.args(args);
        cmd
    }

    fn post_sale(&self, amount: &str) {
        let debit = format!("101:{amount}:0");
        let credit = format!("401:0:{amount}");
        self.run(&[
            "journal",
            "add",
            "--date",
            "2025-01-15",
            "--description",
            "Consulting sale",
            "--line",
            &debit,
            "--line",
            &credit,
        ])
        .assert()
        .success();
    }
}

#[test]
fn test_commands_before_init_point_at_setup() {
    let books = Books::empty();
    books
        .run(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not found"));
    books
        .run(&["accounts", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ledgerly init"));
}

#[test]
fn test_post_entry_and_trial_balance() {
    let books = Books::new();
    books
        .run(&[
            "journal",
            "add",
            "--date",
            "2025-01-15",
            "--description",
            "Consulting sale",
            "--line",
            "101:1250:0",
            "--line",
            "401:0:1250",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Posted JE-001"));

    books
        .run(&["report", "trial-balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Consulting"))
        .stdout(predicate::str::contains("$1,250.00"))
        .stdout(predicate::str::contains("Balanced"));
}

#[test]
fn test_unbalanced_entry_is_rejected() {
    let books = Books::new();
    books
        .run(&[
            "journal",
            "add",
            "--date",
            "2025-01-15",
            "--description",
            "Typo",
            "--line",
            "101:100:0",
            "--line",
            "401:0:90",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not balanced"));

    books
        .run(&["journal", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_viewer_can_read_but_not_post() {
    let books = Books::new();
    books.post_sale("300");
    books
        .run(&["users", "add", "viewer@example.com", "--name", "Viewer"])
        .assert()
        .success();

    books
        .run_as("viewer@example.com", &["report", "trial-balance"])
        .assert()
        .success();
    books
        .run_as(
            "viewer@example.com",
            &["journal", "add", "--description", "x", "--line", "101:1:0", "--line", "401:0:1"],
        )
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires the accountant role"));
    books
        .run_as("viewer@example.com", &["users", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires the admin role"));
    books
        .run_as("nobody@example.com", &["accounts", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No signed-in user"));
}

#[test]
fn test_reversal_posts_offsetting_entry() {
    let books = Books::new();
    books.post_sale("500");
    books
        .run(&["journal", "reverse", "JE-001", "--date", "2025-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reversed JE-001 with JE-002"));
    books
        .run(&["journal", "reverse", "JE-001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already been reversed"));

    let output = books.run(&["report", "trial-balance", "--json"]).output().unwrap();
    assert!(output.status.success());
    let tb: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let cash = tb["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["account_code"] == "101")
        .unwrap();
    assert_eq!(cash["debit_total"], 500.0);
    assert_eq!(cash["credit_total"], 500.0);
    assert_eq!(cash["closing_balance"], 0.0);
}

#[test]
fn test_edit_keeps_attachments_and_clears_reference() {
    let books = Books::new();
    let receipt = books.dir.path().join("receipt.png");
    std::fs::write(&receipt, b"fake png bytes").unwrap();
    let attach = format!("1={}", receipt.display());
    books
        .run(&[
            "journal",
            "add",
            "--date",
            "2025-01-15",
            "--description",
            "Consulting sale",
            "--reference",
            "INV-7",
            "--line",
            "101:100:0",
            "--line",
            "401:0:100",
            "--attach",
            &attach,
        ])
        .assert()
        .success();

    let show = |books: &Books| -> serde_json::Value {
        let output = books.run(&["journal", "show", "JE-001", "--json"]).output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    };
    let before = show(&books);
    assert_eq!(before["reference"], "INV-7");
    assert!(before["lines"][0]["image_data"].is_string());

    books
        .run(&[
            "journal",
            "edit",
            "JE-001",
            "--description",
            "Consulting sale, January",
            "--reference",
            "",
            "--line",
            "101:120:0",
            "--line",
            "401:0:120",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated JE-001"));

    let after = show(&books);
    assert_eq!(after["description"], "Consulting sale, January");
    assert!(after["reference"].is_null());
    assert_eq!(after["lines"][0]["image_data"], before["lines"][0]["image_data"]);
    assert_eq!(after["total_debit"], 120.0);

    books
        .run(&["journal", "edit", "JE-001", "--line", "101:120:0", "--line", "401:0:120", "--detach", "1"])
        .assert()
        .success();
    assert!(show(&books)["lines"][0].get("image_data").is_none());
}

#[test]
fn test_one_sided_range_is_rejected() {
    let books = Books::new();
    books
        .run(&["report", "trial-balance", "--from", "2025-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from requires --to"));
}

#[test]
fn test_account_with_postings_cannot_be_deleted() {
    let books = Books::new();
    books.post_sale("10");
    books
        .run(&["accounts", "delete", "101"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("account has 1 transaction"));
}

#[test]
fn test_export_journal_csv() {
    let books = Books::new();
    books.post_sale("42.50");
    let out = books.dir.path().join("journal.csv");
    books
        .run(&["export", "journal", "--output", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 lines from 1 entries"));
    let csv = std::fs::read_to_string(out).unwrap();
    assert!(csv.contains("JE-001,2025-01-15,Consulting sale"));
}

#[test]
fn test_demo_loads_once() {
    let books = Books::new();
    books
        .run(&["demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo data loaded!"));
    books
        .run(&["demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already loaded"));
    books
        .run(&["report", "trial-balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balanced"));
}

#[test]
fn test_completions() {
    Command::cargo_bin("ledgerly")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ledgerly"));
}
