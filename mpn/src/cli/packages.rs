// mpn/src/cli/packages.rs
use std::path::Path;

use clap::Args;
use colored::Colorize;
use mpn_common::config::{Config, PACKAGE_TREE_DIRNAME};
use mpn_common::error::Result;
use mpn_common::model::Package;
use mpn_core::{NodeResolver, PackageCatalog};

#[derive(Args, Debug)]
pub struct Packages {
    /// Include packages nested inside other packages' node_modules
    #[arg(long)]
    pub all: bool,
}

impl Packages {
    pub async fn run(&self, config: Config) -> Result<()> {
        let tree = config.package_tree_dir();
        let catalog = PackageCatalog::build(tree, &NodeResolver::new());
        let rows = self.rows(&catalog);
        if rows.is_empty() {
            println!(
                "{}",
                format!("0 packages installed in {}", tree.display()).yellow()
            );
            return Ok(());
        }

        println!(
            "{:<32} {:<12} {:<20} {}",
            "NAME".bold().dimmed(),
            "VERSION".bold().dimmed(),
            "OUTPUT".bold().dimmed(),
            "MAIN".bold().dimmed()
        );
        for row in &rows {
            println!(
                "{:<32} {:<12} {:<20} {}",
                row[0].cyan(),
                row[1],
                row[2],
                row[3]
            );
        }
        println!("\n{}: {}", "Total".bold(), rows.len());
        Ok(())
    }

    fn rows(&self, catalog: &PackageCatalog) -> Vec<[String; 4]> {
        let mut packages: Vec<&Package> = catalog
            .iter()
            .map(|p| &**p)
            .filter(|p| self.all || !is_nested(p, catalog.tree_root()))
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name).then(a.root.cmp(&b.root)));
        packages.into_iter().map(row).collect()
    }
}

fn is_nested(package: &Package, tree_root: &Path) -> bool {
    match package.root.strip_prefix(tree_root) {
        Ok(rel) => rel
            .components()
            .any(|c| c.as_os_str() == PACKAGE_TREE_DIRNAME),
        Err(_) => true,
    }
}

fn row(package: &Package) -> [String; 4] {
    let dash = || "–".to_string();
    let output = package
        .alternate_output
        .as_deref()
        .and_then(|alt| alt.strip_prefix(&package.root).ok())
        .map(|rel| rel.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    [
        package.name.clone(),
        package.version.clone().unwrap_or_else(dash),
        output,
        package
            .main_entry
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(dash),
    ]
}
