use crate::areas::repository::Repository;
use crate::artifacts::remote::RemoteConfig;
use anyhow::{Context, Result};
use std::io::Write;

impl Repository {
    fn remote_config(&self) -> Result<RemoteConfig> {
        let mut config = RemoteConfig::new(&self.git_path());
        config.load().context("git remote: unable to load config")?;
        Ok(config)
    }

    pub fn remote_add(&mut self, name: &str, url: &str) -> Result<()> {
        self.remote_config()?
            .add(name, url)
            .with_context(|| format!("git remote add {name}"))
    }

    pub fn remote_remove(&mut self, name: &str) -> Result<()> {
        self.remote_config()?
            .remove(name)
            .with_context(|| format!("git remote remove {name}"))
    }

    pub fn remote_list(&mut self, verbose: bool) -> Result<()> {
        let config = self.remote_config()?;
        let mut writer = self.writer();
        for remote in config.list() {
            if verbose {
                writeln!(writer, "{}\t{} (fetch)", remote.name, remote.fetch_url)?;
                writeln!(writer, "{}\t{} (push)", remote.name, remote.push_url)?;
            } else {
                writeln!(writer, "{}", remote.name)?;
            }
        }
        Ok(())
    }

    pub fn remote_show(&mut self, name: &str) -> Result<()> {
        let config = self.remote_config()?;
        let remote = config
            .get(name)
            .with_context(|| format!("git remote show {name}"))?;

        let mut writer = self.writer();
        writeln!(writer, "* remote {}", remote.name)?;
        writeln!(writer, "  Fetch URL: {}", remote.fetch_url)?;
        writeln!(writer, "  Push  URL: {}", remote.push_url)?;
        Ok(())
    }
}
