use std::{cell::RefCell, rc::Rc, str::from_utf8};

use fastpay_ledger::{bin_utils::Service, config::LedgerConfig, error::ErrorKind};
use rust_decimal::Decimal;

const TEST_FILE: &str = include_str!("operations.csv");

#[test]
fn process_operations() {
    let mut output = Vec::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let collected = errors.clone();
    let service = Service {
        input: TEST_FILE.as_bytes(),
        output: &mut output,
        config: LedgerConfig::default(),
        error_printer: Box::new(move |_line, err| collected.borrow_mut().push(err.kind())),
    };
    service.run().unwrap();

    assert_eq!(
        *errors.borrow(),
        vec![
            ErrorKind::Validation,
            ErrorKind::Unauthorized,
            ErrorKind::Conflict,
            ErrorKind::Validation,
            ErrorKind::Duplicate,
            ErrorKind::NotFound,
            ErrorKind::Validation,
            ErrorKind::Validation,
            ErrorKind::Validation,
            ErrorKind::Validation,
        ]
    );

    let output = from_utf8(&output).unwrap();
    let mut lines = output.lines();
    assert_eq!(lines.next(), Some("id,name,email,balance"));
    // ids are random, so compare everything after them
    let rows: Vec<(String, Decimal)> = lines
        .map(|line| {
            let (id, rest) = line.split_once(',').unwrap();
            assert!(id.ends_with("@fastpay"));
            let (owner, balance) = rest.rsplit_once(',').unwrap();
            (owner.to_string(), balance.parse().unwrap())
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Alice,alice@example.com".to_string(), Decimal::new(750, 0)),
            ("Bob,bob@example.com".to_string(), Decimal::new(114950, 2)),
            ("Carol,carol@example.com".to_string(), Decimal::new(110050, 2)),
        ]
    );
}

#[test]
fn starting_balance_from_config() {
    let mut output = Vec::new();
    let service = Service {
        input: "type,email,name,password,counterparty,amount\nsignup,zed@example.com,Zed,pw,,\n"
            .as_bytes(),
        output: &mut output,
        config: LedgerConfig {
            starting_balance: Decimal::new(5, 0),
            id_domain: "bank".to_string(),
            ..Default::default()
        },
        error_printer: Box::new(|line, err| panic!("unexpected error at line {line}: {err}")),
    };
    service.run().unwrap();

    let output = from_utf8(&output).unwrap();
    let row = output.lines().nth(1).unwrap();
    assert!(row.ends_with("@bank,Zed,zed@example.com,5"));
}

#[test]
fn request_checks_precede_receiver_lookup() {
    let mut output = Vec::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let collected = errors.clone();
    let service = Service {
        input: "type,email,name,password,counterparty,amount
signup,alice@example.com,Alice,pw,,
transfer,alice@example.com,,pw,dave@example.com,0
transfer,alice@example.com,,pw,dave@example.com,
transfer,alice@example.com,,pw, Alice@Example.com ,5
transfer,alice@example.com,,pw,dave@example.com,5
"
        .as_bytes(),
        output: &mut output,
        config: LedgerConfig::default(),
        error_printer: Box::new(move |_line, err| {
            collected.borrow_mut().push((err.kind(), err.to_string()))
        }),
    };
    service.run().unwrap();

    assert_eq!(
        *errors.borrow(),
        vec![
            (ErrorKind::Validation, "Amount must be greater than zero".to_string()),
            (ErrorKind::Validation, "Amount is required for a transfer".to_string()),
            (
                ErrorKind::Validation,
                "Sender and receiver must be different accounts".to_string()
            ),
            (
                ErrorKind::NotFound,
                "No account is registered for this owner".to_string()
            ),
        ]
    );
}
