use std::{fs, io, path::PathBuf, process};

use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, Level};

use koa::bytecode::{parse_assembly, Asm};
use koa::{repl, CompiledContract, Error};

#[derive(Parser)]
#[command(name = "koa")]
#[command(about = "Compiler for the Koa contract language", long_about = None)]
#[command(version)]
struct Cli {
  /// Log more detail; repeat for debug and trace output
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compile a contract and print its ABI, assembly and raw bytecode as JSON
  #[command(visible_alias = "c")]
  Compile {
    path: PathBuf,
  },
  /// Assemble an assembly file and print the raw bytecode as hex
  Assemble {
    path: PathBuf,
  },
  /// Print the assembly of hex encoded raw bytecode
  Disassemble {
    bytecode: String,
  },
  /// Start the interactive shell
  Repl,
}

fn main() {
  let cli = Cli::parse();

  init_tracing(match cli.verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  });

  if let Err(e) = run(cli.command) {
    error!("{}", e);
    process::exit(1);
  }
}

fn run(command: Command) -> Result<(), Error> {
  match command {

    Command::Compile { path } => {
      let source   = fs::read_to_string(&path)?;
      let artifact = CompiledContract::from_source(&source)?;
      println!("{}", artifact.to_json()?);
    }

    Command::Assemble { path } => {
      let text = fs::read_to_string(&path)?;
      println!("{}", parse_assembly(&text)?.to_hex());
    }

    Command::Disassemble { bytecode } => {
      let code = hex::decode(bytecode.trim().trim_start_matches("0x"))?;
      print!("{}", Asm::from_bytecode(&code)?);
    }

    Command::Repl => {
      println!("{}", repl::BANNER);
      let stdin = io::stdin();
      repl::run(stdin.lock(), &mut io::stdout())?;
    }

  }

  Ok(())
}

/// Diagnostics go to stderr so that command output can be piped.
fn init_tracing(level: Level) {
  let _ = tracing_subscriber::fmt()
    .without_time()
    .with_target(false)
    .with_max_level(level)
    .with_writer(io::stderr)
    .try_init();
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_subcommands() {
    let cli = Cli::try_parse_from(["koa", "-vv", "c", "token.koa"]).unwrap();
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Command::Compile { ref path } if path == &PathBuf::from("token.koa")));

    let cli = Cli::try_parse_from(["koa", "disassemble", "2100000000000000012630"]).unwrap();
    assert!(matches!(cli.command, Command::Disassemble { .. }));
  }

  #[test]
  fn disassembles_hex() {
    assert!(run(Command::Disassemble { bytecode: "0x2100000000000000012630".to_string() }).is_ok());
    assert!(matches!(
      run(Command::Disassemble { bytecode: "zz".to_string() }),
      Err(Error::Hex(_))
    ));
  }
}
