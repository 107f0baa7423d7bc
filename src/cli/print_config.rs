use crate::{
    cli::{PrintConfigArgs, load_config},
    config::ConfigError,
};

pub fn main(args: PrintConfigArgs) -> Result<(), ConfigError> {
    let config = load_config(args.config.as_deref())?;
    println!("{}", config.to_json()?);
    Ok(())
}
