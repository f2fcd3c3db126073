use irvalidator::ir::IrBuiltIns;
use irvalidator::reader::Reader;
use irvalidator::validation::{
    AriadneSink, ValidationSettings, check_declaration_parents, validate_ir,
};

use log::info;
use yansi::Paint;

use std::fmt::Display;
use std::{env, fs, io, process};

fn fail(message: impl Display) -> ! {
    eprintln!("{} {}", "error:".red().bold(), message);
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(filepath) = args.get(1) else {
        fail("usage: irvalidator <file.ir> [settings.toml]");
    };

    let contents = match fs::read_to_string(filepath) {
        Ok(contents) => contents,
        Err(err) => fail(format!("could not read {}: {}", filepath, err)),
    };

    let settings = match args.get(2) {
        Some(path) => ValidationSettings::load(path).unwrap_or_else(|err| fail(err)),
        None => ValidationSettings::default(),
    };

    let mut reader = Reader::new(&contents, filepath.clone());
    let tree = reader.read_module();
    if reader.report_errors(&contents) {
        fail("cant continue. the IR could not be read");
    }
    let Some(root) = tree.root() else {
        fail("the IR has no module");
    };
    info!("read {} elements from {}", tree.len(), filepath);

    let Some(escalation) = settings.mode.escalation() else {
        println!("{} validation is disabled", "note:".cyan().bold());
        return;
    };

    let mut sink = AriadneSink::new(filepath.clone(), contents.clone(), io::stderr());
    let reported = match validate_ir(
        &tree,
        root,
        IrBuiltIns::standard(),
        &settings.validator,
        escalation,
        &mut sink,
    ) {
        Ok(reported) => reported,
        Err(err) => fail(err),
    };

    if settings.check_parents {
        if let Err(err) = check_declaration_parents(&tree, root) {
            fail(err);
        }
    }

    if reported == 0 {
        println!("{} {}", "ok:".green().bold(), filepath);
    } else {
        println!(
            "{} {} violation(s) in {}",
            "warning:".yellow().bold(),
            reported,
            filepath
        );
    }
}
