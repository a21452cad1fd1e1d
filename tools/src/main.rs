mod config;

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use romfs::gyml::types::{AreaParam, StageParam, WorldList, WorldMapInfo};
use romfs::{Codecs, GymlManager, GymlRef, GymlType, LoggingErrorHandler, RomFs};
use stage_graph::{Stage, StageGraph, StageLoader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{env_root, resolve_root, ConfigError, RootKind, ToolsConfig, CONFIG_FILE_NAME};

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_CONFIG: i32 = 10;
const EXIT_ROMFS: i32 = 11;
const EXIT_LOAD: i32 = 12;

#[derive(Parser)]
#[command(name = "romfs-tools", version, about = "Inspect a romfs dump and its mod overlay")]
struct Cli {
    /// Base romfs directory.
    #[arg(long, value_name = "DIR", global = true)]
    base: Option<PathBuf>,

    /// Mod directory layered over the base romfs.
    #[arg(long = "mod", value_name = "DIR", global = true)]
    mod_dir: Option<PathBuf>,

    /// Config file; defaults to ./romfs-tools.toml when present.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the romfs layout and its system files.
    Check,
    /// Resolve a gyml file and print its inheritance chain.
    Gyml {
        /// Production path, e.g. Work/Stage/StageParam/X.game__stage__StageParam.gyml
        path: String,
        #[arg(long, value_enum, default_value_t = GymlKindArg::StageParam)]
        kind: GymlKindArg,
    },
    /// Load a stage and validate its graph.
    Stage {
        /// StageParam production path.
        path: String,
    },
    /// Inspect pack archives.
    Pack(PackArgs),
}

#[derive(ValueEnum, Clone, Copy)]
enum GymlKindArg {
    StageParam,
    AreaParam,
    WorldMapInfo,
    WorldList,
}

#[derive(Args)]
struct PackArgs {
    #[command(subcommand)]
    command: PackCommand,
}

#[derive(Subcommand)]
enum PackCommand {
    /// List the entries of a pack archive.
    List {
        /// Romfs-relative pack path, e.g. Pack/Bootup.Nin_NX_NVN.pack.zs
        path: String,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> i32 {
    let roots = match resolve_roots(&cli) {
        Ok(roots) => roots,
        Err(err) => {
            eprintln!("{}", err);
            return EXIT_CONFIG;
        }
    };
    let mut handler = LoggingErrorHandler::new();
    let romfs = match RomFs::load(
        &roots.base,
        roots.mod_dir.as_deref(),
        Codecs::default(),
        &mut handler,
    ) {
        Ok(romfs) => romfs,
        Err(_) => {
            eprintln!(
                "romfs at {} is not usable ({} problem(s) reported)",
                roots.base.display(),
                handler.reported
            );
            return EXIT_ROMFS;
        }
    };

    match cli.command {
        Commands::Check => check(&romfs),
        Commands::Gyml { path, kind } => match kind {
            GymlKindArg::StageParam => show_gyml::<StageParam>(&romfs, &path, &mut handler),
            GymlKindArg::AreaParam => show_gyml::<AreaParam>(&romfs, &path, &mut handler),
            GymlKindArg::WorldMapInfo => show_gyml::<WorldMapInfo>(&romfs, &path, &mut handler),
            GymlKindArg::WorldList => show_gyml::<WorldList>(&romfs, &path, &mut handler),
        },
        Commands::Stage { path } => show_stage(&romfs, &path, &mut handler),
        Commands::Pack(args) => match args.command {
            PackCommand::List { path } => pack_list(&romfs, &path, &mut handler),
        },
    }
}

struct Roots {
    base: PathBuf,
    mod_dir: Option<PathBuf>,
}

fn resolve_roots(cli: &Cli) -> Result<Roots, ConfigError> {
    let config = match &cli.config {
        Some(path) => ToolsConfig::load(path, true)?,
        None => ToolsConfig::load(&PathBuf::from(CONFIG_FILE_NAME), false)?,
    };
    let base = resolve_root(
        RootKind::Base,
        cli.base.as_deref(),
        env_root(RootKind::Base),
        &config,
    )?
    .ok_or(ConfigError::MissingRoot {
        kind: RootKind::Base,
    })?;
    debug!("{}", base.describe());
    let mod_dir = resolve_root(
        RootKind::Mod,
        cli.mod_dir.as_deref(),
        env_root(RootKind::Mod),
        &config,
    )?;
    if let Some(resolved) = &mod_dir {
        debug!("{}", resolved.describe());
    }
    Ok(Roots {
        base: base.path,
        mod_dir: mod_dir.map(|resolved| resolved.path),
    })
}

fn check(romfs: &RomFs) -> i32 {
    println!("base: {}", romfs.base().display());
    match romfs.mod_dir() {
        Some(mod_dir) => println!("mod: {}", mod_dir.display()),
        None => println!("mod: <none>"),
    }
    println!(
        "boot pack: {} ({} entries)",
        romfs.boot_pack().path(),
        romfs.boot_pack().names().len()
    );
    println!(
        "resource size table: version {}, {} entries",
        romfs.size_table().version(),
        romfs.size_table().len()
    );
    println!("address table: {} redirects", romfs.address_table().len());
    EXIT_SUCCESS
}

fn show_gyml<T>(romfs: &RomFs, path: &str, handler: &mut LoggingErrorHandler) -> i32
where
    T: GymlType + fmt::Debug,
{
    let gyml = match GymlRef::<T>::parse(path) {
        Ok(gyml) => gyml,
        Err(err) => {
            eprintln!("{}", err);
            return EXIT_USAGE;
        }
    };
    let mut gymls = GymlManager::new();
    let file = match gymls.load_gyml(romfs, &gyml, handler, None) {
        Ok(file) => file,
        Err(_) => {
            eprintln!("{} failed to load ({} problem(s) reported)", path, handler.reported);
            return EXIT_LOAD;
        }
    };

    let mut level = Some(&file);
    while let Some(current) = level {
        println!("{} ({})", current.path(), current.location());
        level = current.parent();
    }
    println!("{:#?}", file.data());
    EXIT_SUCCESS
}

fn show_stage(romfs: &RomFs, path: &str, handler: &mut LoggingErrorHandler) -> i32 {
    let stage_ref = match GymlRef::<StageParam>::parse(path) {
        Ok(stage_ref) => stage_ref,
        Err(err) => {
            eprintln!("{}", err);
            return EXIT_USAGE;
        }
    };
    let mut gymls = GymlManager::new();
    let mut loader = StageLoader::new(romfs, &mut gymls, handler);
    let stage = match loader.load_stage(&stage_ref) {
        Ok(stage) => stage,
        Err(_) => {
            let reported = loader.handler().reported;
            eprintln!("{} failed to load ({} problem(s) reported)", path, reported);
            return EXIT_LOAD;
        }
    };

    println!("{} ({})", path, stage.base().category());
    match &stage {
        Stage::Course(course) => {
            for area in course.areas() {
                println!("  area {}", area.base().gyml_ref());
            }
        }
        Stage::WorldMap(world_map) => {
            for key in world_map.course_keys() {
                println!("  course {}", key);
            }
        }
    }
    print_graph(stage.graph());
    info!(stage = %stage_ref, "stage valid");
    EXIT_SUCCESS
}

fn print_graph(graph: &StageGraph) {
    for fragment in graph.fragments() {
        println!(
            "  fragment {} ({}): {} actors, {} rails, {} bg units",
            fragment.mumap,
            fragment.location,
            fragment.actors.len(),
            fragment.rails.len(),
            fragment.bg_units.len()
        );
    }
    println!(
        "  links: {}, rail links: {}, simultaneous groups: {}",
        graph.links().len(),
        graph.rail_links().len(),
        graph.groups().len()
    );
}

fn pack_list(romfs: &RomFs, path: &str, handler: &mut LoggingErrorHandler) -> i32 {
    let pack = match romfs.load_pack(path, handler) {
        Ok(pack) => pack,
        Err(_) => {
            eprintln!("{} failed to load ({} problem(s) reported)", path, handler.reported);
            return EXIT_LOAD;
        }
    };
    println!("pack: {}", pack.path());
    for name in pack.names() {
        match romfs.resource_size(name) {
            Some(size) => println!("{:>10} {}", size, name),
            None => println!("{:>10} {}", "-", name),
        }
    }
    EXIT_SUCCESS
}
