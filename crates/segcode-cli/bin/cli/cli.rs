use clap::{Args, Parser, Subcommand, ValueEnum};
use segcode_core::DEFAULT_BUSINESS_KEY;
use segcode_generator::obfuscator::{DEFAULT_MODULUS, DEFAULT_PRIME};
use segcode_generator::{
    ObfuscatorSettings, SegmentSettings, ShortCodeSettings, StartupPolicy, DEFAULT_CODE_LENGTH,
};
use std::fmt::{Display, Formatter};

pub const STORE_ENV: &str = "SEGCODE_STORE";
pub const MYSQL_DSN_ENV: &str = "SEGCODE_MYSQL_DSN";
pub const BUSINESS_KEY_ENV: &str = "SEGCODE_BUSINESS_KEY";
pub const INITIAL_VALUE_ENV: &str = "SEGCODE_INITIAL_VALUE";
pub const STEP_ENV: &str = "SEGCODE_STEP";
pub const PREFETCH_THRESHOLD_ENV: &str = "SEGCODE_PREFETCH_THRESHOLD";
pub const PRIME_ENV: &str = "SEGCODE_PRIME";
pub const MODULUS_ENV: &str = "SEGCODE_MODULUS";
pub const CODE_LENGTH_ENV: &str = "SEGCODE_CODE_LENGTH";
pub const WORKER_ID_ENV: &str = "SEGCODE_WORKER_ID";
pub const DATACENTER_ID_ENV: &str = "SEGCODE_DATACENTER_ID";
pub const LOG_FORMAT_ENV: &str = "SEGCODE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StoreArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreArg::InMemory => write!(f, "in-memory"),
            StoreArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "segcode", about = "Generate short codes from segment-allocated ids")]
pub struct CLI {
    #[arg(
        long,
        global = true,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Allocate ids from the segment store and print their short codes.
    Generate {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        segment: SegmentArgs,
        #[command(flatten)]
        code: CodeArgs,
        /// Number of codes to print.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,
    },
    /// Print the raw id behind each short code.
    Decode {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Print store-free codes built from Snowflake ids.
    Snowflake {
        #[arg(long, env = WORKER_ID_ENV, default_value_t = 0)]
        worker_id: u8,
        #[arg(long, env = DATACENTER_ID_ENV, default_value_t = 0)]
        datacenter_id: u8,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,
    },
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    #[arg(long, env = STORE_ENV, value_enum, default_value_t = StoreArg::InMemory)]
    pub store: StoreArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("store", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Create the counter table before generating.
    #[arg(long)]
    pub create_schema: bool,
}

#[derive(Debug, Args)]
pub struct SegmentArgs {
    #[arg(long, env = BUSINESS_KEY_ENV, default_value = DEFAULT_BUSINESS_KEY)]
    pub business_key: String,

    #[arg(long, env = INITIAL_VALUE_ENV, default_value_t = 0)]
    pub initial_value: u64,

    #[arg(long, env = STEP_ENV, default_value_t = 1000)]
    pub step: u64,

    #[arg(long, env = PREFETCH_THRESHOLD_ENV, default_value_t = 100)]
    pub prefetch_threshold: u64,
}

#[derive(Debug, Args)]
pub struct CodeArgs {
    #[arg(long, env = PRIME_ENV, default_value_t = DEFAULT_PRIME)]
    pub prime: u64,

    #[arg(long, env = MODULUS_ENV, default_value_t = DEFAULT_MODULUS)]
    pub modulus: u64,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = DEFAULT_CODE_LENGTH)]
    pub code_length: usize,
}

impl SegmentArgs {
    pub fn settings(&self) -> SegmentSettings {
        SegmentSettings::builder()
            .business_key(self.business_key.clone())
            .initial_value(self.initial_value)
            .step(self.step)
            .prefetch_threshold(self.prefetch_threshold)
            .startup(StartupPolicy::FailFast)
            .build()
    }
}

impl CodeArgs {
    pub fn settings(&self, segment: SegmentSettings) -> ShortCodeSettings {
        ShortCodeSettings::builder()
            .segment(segment)
            .obfuscator(
                ObfuscatorSettings::builder()
                    .prime(self.prime)
                    .modulus(self.modulus)
                    .build(),
            )
            .code_length(self.code_length)
            .build()
    }
}
