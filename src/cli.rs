// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .short('m')
        .value_name("YYYY-MM")
        .help("Month to show (defaults to the current month)")
}

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    ]
}

pub fn build_cli() -> Command {
    Command::new("monthbook")
        .version(clap::crate_version!())
        .about("Track monthly income and expenses against a hosted backend")
        .arg(
            Arg::new("backend")
                .long("backend")
                .global(true)
                .value_parser(["local", "remote"])
                .help("Backend to use (overrides MONTHBOOK_BACKEND)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output to stderr"),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in")
                .arg(Arg::new("email").long("email").required(true))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .default_value("")
                        .help("Password (ignored by the local backend)"),
                ),
        )
        .subcommand(
            Command::new("signup")
                .about("Create an account")
                .arg(Arg::new("email").long("email").required(true))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .default_value("")
                        .help("Password (ignored by the local backend)"),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
        .subcommand(
            Command::new("summary")
                .about("Balance, income and expenses for a month")
                .arg(month_arg())
                .args(json_args()),
        )
        .subcommand(
            Command::new("categories")
                .about("Expenses per category for a month")
                .arg(month_arg())
                .args(json_args()),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Record a transaction")
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true),
                        )
                        .arg(Arg::new("description").long("description").short('d').required(true))
                        .arg(Arg::new("category").long("category").short('c').required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .short('t')
                                .value_parser(["income", "expense"])
                                .default_value("expense"),
                        )
                        .arg(
                            Arg::new("date")
                                .long("date")
                                .value_name("YYYY-MM-DD")
                                .help("Transaction date (defaults to today)"),
                        )
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .about("List a month's transactions, newest first")
                        .arg(month_arg())
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a transaction by id")
                        .arg(Arg::new("id").required(true))
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("export")
                        .about("Export a month's transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .value_parser(["csv", "json"])
                                .default_value("csv"),
                        )
                        .arg(Arg::new("out").long("out").short('o').required(true))
                        .arg(month_arg()),
                ),
        )
}
