mod cli;
mod logging;

use crate::cli::{CodeArgs, Command, SegmentArgs, StoreArg, StoreArgs, CLI};
use anyhow::Context;
use clap::Parser;
use segcode_core::SegmentStore;
use segcode_generator::{
    SegmentShortCodeGenerator, ShortCodeSettings, SnowflakeShortCodeGenerator,
};
use segcode_snowflake::{Snowflake, SnowflakeSettings};
use segcode_storage::{InMemorySegmentStore, MySqlSegmentStore};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    logging::init(config.log_format);

    match config.command {
        Command::Generate {
            store,
            segment,
            code,
            count,
        } => generate(store, segment, code, count).await,
        Command::Decode { code, codes } => decode(code, &codes),
        Command::Snowflake {
            worker_id,
            datacenter_id,
            count,
        } => snowflake(worker_id, datacenter_id, count),
    }
}

async fn generate(
    store: StoreArgs,
    segment: SegmentArgs,
    code: CodeArgs,
    count: u64,
) -> anyhow::Result<()> {
    info!(
        store = %store.store,
        business_key = %segment.business_key,
        step = segment.step,
        prefetch_threshold = segment.prefetch_threshold,
        "starting short code generation"
    );

    let settings = code.settings(segment.settings());
    match store.store {
        StoreArg::InMemory => {
            print_codes(Arc::new(InMemorySegmentStore::new()), settings, count).await
        }
        StoreArg::Mysql => {
            let dsn = store
                .mysql_dsn
                .context("mysql dsn is required when the store is mysql")?;
            let mysql = MySqlSegmentStore::connect(&dsn)
                .await
                .context("failed to connect to mysql")?;
            if store.create_schema {
                mysql.create_schema().await.context("failed to create schema")?;
            }
            print_codes(Arc::new(mysql), settings, count).await
        }
    }
}

async fn print_codes<S: SegmentStore>(
    store: Arc<S>,
    settings: ShortCodeSettings,
    count: u64,
) -> anyhow::Result<()> {
    let generator = SegmentShortCodeGenerator::new(store, settings)?;
    generator
        .ensure_initialized()
        .await
        .context("failed to initialize the segment window")?;

    for _ in 0..count {
        println!("{}", generator.generate_short_code().await?);
    }
    Ok(())
}

fn decode(code: CodeArgs, codes: &[String]) -> anyhow::Result<()> {
    // Decoding never reaches the store.
    let settings = code.settings(Default::default());
    let generator =
        SegmentShortCodeGenerator::new(Arc::new(InMemorySegmentStore::new()), settings)?;

    for short_code in codes {
        let id = generator
            .decode(short_code)
            .with_context(|| format!("cannot decode {short_code:?}"))?;
        println!("{short_code}\t{id}");
    }
    Ok(())
}

fn snowflake(worker_id: u8, datacenter_id: u8, count: u64) -> anyhow::Result<()> {
    let settings = SnowflakeSettings::builder()
        .worker_id(worker_id)
        .datacenter_id(datacenter_id)
        .build();
    let generator = SnowflakeShortCodeGenerator::new(Snowflake::new(settings)?)?;

    for _ in 0..count {
        let code = generator.generate_short_code()?;
        let id = generator.decode(code.as_str())?;
        println!("{code}\t{}", id.as_u64());
    }
    Ok(())
}
