#![deny(unused_must_use)]

#[macro_use]
extern crate log;

use std::io::{stdout, Write};
use std::path::{Path, PathBuf};

use clap;

use rusty_seal::envelope::*;
use rusty_seal::error::SealError;
use rusty_seal::misc::*;

const SEALED_EXTENSION: &str = "sealed";

fn recipient_key_arg<'a, 'b>(help: &'b str) -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("recipient_key").long("recipient-key")
        .help(help)
        .required(true)
        .takes_value(true)
}

fn sender_key_arg<'a, 'b>(help: &'b str, required: bool) -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("sender_key").long("sender-key")
        .help(help)
        .required(required)
        .takes_value(true)
}

fn input_arg<'a, 'b>(help: &'b str) -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("input")
        .help(help)
        .required(true)
}

fn output_arg<'a, 'b>() -> clap::Arg<'a, 'b> {
    clap::Arg::with_name("output").long("output").short("o")
        .help("Output file path")
        .takes_value(true)
}

fn main() {
    env_logger::from_env(env_logger::Env::default().default_filter_or("rusty_seal=info")).init();

    let args = clap::App::new("Rusty Seal").version(env!("CARGO_PKG_VERSION"))
        .about("Seals files for a recipient's RSA key, optionally signed by the sender")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(clap::SubCommand::with_name("seal")
            .about("Encrypts a file into a JSON envelope")
            .arg(input_arg("File to seal"))
            .arg(recipient_key_arg("Recipient public key file (PEM or base64)"))
            .arg(sender_key_arg("Sender private key file used to sign the content", false))
            .arg(output_arg()))
        .subcommand(clap::SubCommand::with_name("open")
            .about("Decrypts a JSON envelope")
            .arg(input_arg("Envelope to open"))
            .arg(recipient_key_arg("Recipient private key file (PEM or base64)"))
            .arg(sender_key_arg("Sender public key file used to verify the content", false))
            .arg(output_arg())
            .arg(clap::Arg::with_name("allow_unverified").long("allow-unverified")
                .help("Write files that are unsigned or were not checked against a sender key")))
        .subcommand(clap::SubCommand::with_name("sign")
            .about("Prints the base64 signature of a file")
            .arg(input_arg("File to sign"))
            .arg(sender_key_arg("Sender private key file", true)))
        .subcommand(clap::SubCommand::with_name("verify")
            .about("Checks a base64 signature of a file")
            .arg(input_arg("Signed file"))
            .arg(clap::Arg::with_name("signature").long("signature")
                .help("Base64 signature")
                .required(true)
                .takes_value(true))
            .arg(sender_key_arg("Sender public key file", true)))
        .subcommand(clap::SubCommand::with_name("hex")
            .about("Prints a file hex encoded")
            .arg(input_arg("File to encode")))
        .subcommand(clap::SubCommand::with_name("unhex")
            .about("Decodes a hex encoded file")
            .arg(input_arg("File to decode"))
            .arg(output_arg()))
        .get_matches();

    let result = match args.subcommand() {
        ("seal", Some(args)) => seal(args),
        ("open", Some(args)) => open(args),
        ("sign", Some(args)) => sign(args),
        ("verify", Some(args)) => verify(args),
        ("hex", Some(args)) => hex(args),
        ("unhex", Some(args)) => unhex(args),
        _ => unreachable!("subcommand required"),
    };
    match result {
        Ok(0) => (),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        },
    }
}

// required arguments are enforced by clap
fn required<'a>(args: &'a clap::ArgMatches, name: &str) -> &'a str {
    args.value_of(name).unwrap_or_default()
}

fn seal_output_path(input: &Path) -> PathBuf {
    let mut file_name = input.file_name().unwrap_or_default().to_owned();
    file_name.push(".");
    file_name.push(SEALED_EXTENSION);
    input.with_file_name(file_name)
}

fn open_output_path(input: &Path) -> PathBuf {
    if input.extension().map_or(false, |extension| extension == SEALED_EXTENSION) {
        input.with_extension("")
    } else {
        input.with_extension("opened")
    }
}

fn seal(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let input = Path::new(required(args, "input"));
    let output = args.value_of("output").map(PathBuf::from).unwrap_or_else(|| seal_output_path(input));
    let recipient_public_key = read_key_file(required(args, "recipient_key"))?;
    let sender_private_key = args.value_of("sender_key").map(read_key_file).transpose()?;
    if sender_private_key.is_none() {
        warn!("No sender key given, the envelope will not be signed");
    }
    let encryptor = EnvelopeEncryptor::try_new(&recipient_public_key, sender_private_key.as_ref().map(String::as_str))?;
    seal_file(input, &output, &encryptor)?;
    info!("Envelope written to {}", output.display());
    Ok(0)
}

fn open(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let input = Path::new(required(args, "input"));
    let output = args.value_of("output").map(PathBuf::from).unwrap_or_else(|| open_output_path(input));
    let recipient_private_key = read_key_file(required(args, "recipient_key"))?;
    let sender_public_key = args.value_of("sender_key").map(read_key_file).transpose()?;
    let decryptor = EnvelopeDecryptor::try_new(&recipient_private_key, sender_public_key.as_ref().map(String::as_str))?;
    let authenticity = open_file(input, &output, &decryptor, args.is_present("allow_unverified"))?;
    info!("File written to {} ({})", output.display(), authenticity);
    Ok(0)
}

fn sign(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let file_bytes = read_file(required(args, "input"))?;
    let sender_private_key = read_key_file(required(args, "sender_key"))?;
    let signature = sign_plaintext(&file_bytes, &sender_private_key)?;
    println!("{}", signature);
    Ok(0)
}

fn verify(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let file_bytes = read_file(required(args, "input"))?;
    let sender_public_key = read_key_file(required(args, "sender_key"))?;
    if verify_signature(&file_bytes, required(args, "signature"), &sender_public_key)? {
        info!("Signature verified");
        Ok(0)
    } else {
        warn!("SIGNATURE MISMATCH");
        Ok(1)
    }
}

fn hex(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let file_bytes = read_file(required(args, "input"))?;
    println!("{}", bytes_to_hex(&file_bytes));
    Ok(0)
}

fn unhex(args: &clap::ArgMatches) -> Result<i32, SealError> {
    let contents = read_text_file(required(args, "input"))?;
    let file_bytes = hex_to_bytes(&contents)?;
    match args.value_of("output") {
        Some(output) => write_file(output, &file_bytes)?,
        None => stdout().write_all(&file_bytes)?,
    }
    Ok(0)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        assert_eq!(seal_output_path(Path::new("dir/report.pdf")), PathBuf::from("dir/report.pdf.sealed"));
        assert_eq!(open_output_path(Path::new("dir/report.pdf.sealed")), PathBuf::from("dir/report.pdf"));
        assert_eq!(open_output_path(Path::new("dir/report.json")), PathBuf::from("dir/report.opened"));
    }
}
