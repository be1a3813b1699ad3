use envconfig::Envconfig;
use lazy_static::lazy_static;

#[derive(Debug, Clone, Envconfig)]
pub struct Config {
    /// Key under which shards store their array, and under which the aggregate
    /// file groups its external links.
    #[envconfig(from = "H5SHARD_ROOT_KEY", default = "/data")]
    pub root_key: String,
    #[envconfig(from = "H5SHARD_SHARD_EXTENSION", default = "hdf5")]
    pub shard_extension: String,
    /// Appended to the aggregate file name to derive the shard directory.
    #[envconfig(from = "H5SHARD_PARTS_SUFFIX", default = ".parts")]
    pub parts_suffix: String,
}

impl Config {
    pub fn init() -> Config {
        Config::init_from_env().expect("Failed to load config")
    }
}

lazy_static! {
    pub static ref CONFIG: Config = Config::init();
}
