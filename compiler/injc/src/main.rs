//! `injc`: runs an injection session over a built-in demo module and prints
//! the rewritten bodies.

use inj_diagnostic::ErrorCode;
use inj_hir::{dump, ModuleBuilder};
use inj_ir::StringInterner;
use inj_types::ClassifierTable;
use injc::{Session, SessionConfig};

fn print_usage() {
    println!("Usage: injc [options]");
    println!();
    println!("Resolves and rewrites the injected calls of the demo module.");
    println!();
    println!("Options:");
    println!("  --max-depth <n>     Bound on the depth of one resolution chain (default 256)");
    println!("  --no-metadata       Do not write persisted facts onto declarations");
    println!("  --explain <code>    Describe an error code, e.g. E1001");
    println!("  -h, --help          Show this message");
    println!();
    println!("Environment:");
    println!("  INJ_MAX_DEPTH, INJ_EMIT_METADATA   Defaults for the options above");
    println!("  INJ_LOG (or RUST_LOG)              Tracing filter, e.g. debug");
    println!("  INJ_LOG_TREE                       Hierarchical tracing output");
}

fn explain(code: &str) {
    match ErrorCode::ALL.iter().find(|candidate| candidate.as_str() == code) {
        Some(found) => println!("{found}: {}", found.description()),
        None => {
            eprintln!("error: unknown error code `{code}`");
            std::process::exit(1);
        }
    }
}

fn main() {
    injc::init_tracing();

    let mut config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--no-metadata" => config.emit_metadata = false,
            "--max-depth" if i + 1 < args.len() => {
                match injc::config::parse_depth("--max-depth", &args[i + 1]) {
                    Ok(depth) => config.max_resolution_depth = depth,
                    Err(err) => {
                        eprintln!("error: {err}");
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--explain" if i + 1 < args.len() => {
                explain(&args[i + 1]);
                return;
            }
            other => {
                eprintln!("error: unknown option `{other}`");
                eprintln!("Run `injc --help` for usage.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let interner = StringInterner::new();
    let mut table = ClassifierTable::new(&interner);
    let module = demo_module(&interner, &mut table);
    let mut session = Session::new(config, module, table, interner);
    let result = session.run();

    let module = session.module();
    for decl in module.top_level() {
        let d = module.decl(decl);
        if let Some(body) = d.body {
            let rendered = dump::expr_to_string(module, session.table(), session.interner(), body);
            println!("{} = {rendered}", module.qualified_name(decl, session.interner()));
        }
    }

    match result {
        Ok(stats) => {
            eprintln!(
                "rewrote {} of {} call sites, transformed {} declarations, wrote facts for {}",
                stats.rewritten, stats.call_sites, stats.transformed, stats.facts_written
            );
        }
        Err(_) => {
            eprintln!("{}", session.render_diagnostics());
            std::process::exit(1);
        }
    }
}

/// A small service graph: a shared database, a provider and a plugin list.
fn demo_module(interner: &StringInterner, table: &mut ClassifierTable) -> inj_hir::Module {
    let mut b = ModuleBuilder::new("demo", interner, table);
    let file = b.file("App.kt", "demo");
    let config = b.class(file, "Config");
    let database = b.class(file, "Database");
    let repository = b.class(file, "Repository");
    let service = b.class(file, "Service");
    let plugin = b.class(file, "Plugin");
    let config_ty = b.ty(config);
    let database_ty = b.ty(database);
    let repository_ty = b.ty(repository);
    let service_ty = b.ty(service);
    let plugin_ty = b.ty(plugin);
    let plugins_ty = b.list_of(plugin_ty.clone());
    let unit = b.unit_ty();

    let provide_config = b.function(file, None, "provideConfig", config_ty.clone());
    b.given(provide_config);
    let provide_database = b.function(file, None, "provideDatabase", database_ty.clone());
    b.given(provide_database);
    b.param(provide_database, "config", config_ty);
    let provide_repository = b.function(file, None, "provideRepository", repository_ty.clone());
    b.given(provide_repository);
    b.param(provide_repository, "database", database_ty.clone());
    let provide_service = b.function(file, None, "provideService", service_ty.clone());
    b.given(provide_service);
    b.param(provide_service, "repository", repository_ty);
    b.param(provide_service, "database", database_ty);
    let logging = b.function(file, None, "loggingPlugin", plugin_ty.clone());
    b.given(logging);
    let metrics = b.function(file, None, "metricsPlugin", plugin_ty);
    b.given(metrics);

    let run = b.function(file, None, "run", unit.clone());
    b.inject_param(run, "service", service_ty);
    b.inject_param(run, "plugins", plugins_ty);

    let main = b.function(file, None, "main", unit);
    let call = b.call_bare(run);
    b.set_body(main, call);
    b.finish()
}
