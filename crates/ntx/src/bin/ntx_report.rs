//! ntx-report - Cost-basis reports from a normalized ledger snapshot.

fn main() -> std::process::ExitCode {
    ntx::cmd::report_cmd::main()
}
