use crate::{
    cli::{MethodArg, OutputFormat},
    clipboard::SystemClipboard,
    config::AppConfig,
    error::{AppError, Result},
    output::OutputManager,
};
use indicatif::{ProgressBar, ProgressStyle};
use plugin_client::{
    BaseUrl, LoginController, LoginMethod, Notice, PluginClient, PollOutcome,
};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

pub struct CommandExecutor {
    config: AppConfig,
    controller: LoginController,
    output: OutputManager,
    quiet: bool,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, quiet: bool) -> Result<Self> {
        let page = config.page_url()?;
        let base = BaseUrl::resolve(
            page.as_ref(),
            config.ip.as_deref(),
            &config.base_url_options(),
        )?;
        let client = PluginClient::new(base, config.client_options())?;
        let controller = LoginController::new(client).with_poll_config(config.poll_config()?);

        Ok(Self {
            config,
            controller,
            output: OutputManager::new(cfg!(feature = "colored-output")),
            quiet,
        })
    }

    /// Run a QR login until it is scanned, times out or is interrupted.
    pub async fn login(&mut self, method: Option<MethodArg>, qr_output: Option<&Path>) -> Result<()> {
        let method = match method {
            Some(method) => method.into(),
            None => self.choose_method()?,
        };

        self.print(&Notice::info(format!(
            "Requesting {method} QR code from {}",
            self.controller.base_url()
        )));

        let attempt = self.controller.start_login(method).await?;
        let png = match attempt.image() {
            Ok(png) => png,
            Err(e) => {
                self.controller.close();
                return Err(AppError::Client(e.into()));
            }
        };

        let path = qr_output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.qr_output());
        let qr_file = QrFile::write(path, png)?;
        self.print(&Notice::info(format!(
            "Scan {} with {}",
            qr_file.path.display(),
            method.display_name()
        )));

        let pb = self.spinner(format!("Waiting for {} scan...", method.display_name()));

        let finished = tokio::select! {
            outcome = self.controller.wait_for_login() => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        let outcome = match finished {
            Some(outcome) => outcome,
            None => {
                self.controller.close();
                PollOutcome::Cancelled
            }
        };
        pb.finish_and_clear();
        drop(qr_file);

        let notice = Notice::for_login(&outcome);
        self.print(&notice);
        match outcome {
            PollOutcome::LoggedIn(_) => {
                tokio::time::sleep(self.config.close_delay()).await;
                Ok(())
            }
            PollOutcome::TimedOut => Err(AppError::Reported(notice.message)),
            PollOutcome::Cancelled => Ok(()),
        }
    }

    pub async fn status(&self, format: &OutputFormat) -> Result<()> {
        let status = match self.controller.check_status().await {
            Ok(status) => status,
            Err(e) if format.is_json() => return Err(e.into()),
            Err(e) => return self.report(Notice::for_status(&Err(e))),
        };

        println!("{}", self.output.format_status(&status, format)?);
        if status.valid {
            Ok(())
        } else {
            Err(AppError::Reported(Notice::for_status(&Ok(status)).message))
        }
    }

    pub async fn refresh(&self, format: &OutputFormat) -> Result<()> {
        match self.controller.refresh().await {
            Ok(resp) => {
                println!("{}", self.output.format_refresh(&resp, format)?);
                Ok(())
            }
            Err(e) if format.is_json() => {
                let notice = Notice::for_refresh(&Err(e));
                println!("{}", self.output.format_error(&notice.message, Some(*format)));
                Err(AppError::Reported(notice.message))
            }
            Err(e) => self.report(Notice::for_refresh(&Err(e))),
        }
    }

    pub async fn info(&self, format: &OutputFormat, output_file: Option<&Path>) -> Result<()> {
        let info = match self.controller.credential_info().await {
            Ok(info) => info,
            Err(e) if format.is_json() => return Err(e.into()),
            Err(e) => return self.report(Notice::error(e.to_string())),
        };

        let content = self.output.format_info(&info, format)?;
        match output_file {
            Some(path) => {
                fs::write(path, &content)?;
                info!(path = %path.display(), fields = info.len(), "Credential written");
                self.print(&Notice::success(format!(
                    "Credential written to {}",
                    path.display()
                )));
            }
            None => println!("{content}"),
        }
        Ok(())
    }

    pub async fn copy(&self) -> Result<()> {
        let mut clipboard = SystemClipboard::new();
        let notice = self.controller.copy_credentials(&mut clipboard).await;
        if notice.is_error() {
            return self.report(notice);
        }
        self.print(&notice);
        Ok(())
    }

    pub async fn delete(&self, yes: bool) -> Result<()> {
        if !yes && !self.confirm_delete()? {
            self.print(&Notice::info("Nothing deleted"));
            return Ok(());
        }

        let notice = Notice::for_delete(&self.controller.delete_credential().await);
        if notice.is_error() {
            return self.report(notice);
        }
        self.print(&notice);
        Ok(())
    }

    /// Print an error notice and turn it into a failure the caller will not print again.
    fn report(&self, notice: Notice) -> Result<()> {
        eprintln!("{}", self.output.format_notice(&notice));
        Err(AppError::Reported(notice.message))
    }

    fn print(&self, notice: &Notice) {
        if self.quiet && !notice.is_error() {
            return;
        }
        println!("{}", self.output.format_notice(notice));
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&[
                    "▹▹▹▹▹",
                    "▸▹▹▹▹",
                    "▹▸▹▹▹",
                    "▹▹▸▹▹",
                    "▹▹▹▸▹",
                    "▹▹▹▹▸",
                    "▪▪▪▪▪",
                ]),
        );
        pb.set_message(message);
        pb
    }

    #[cfg(feature = "interactive")]
    fn choose_method(&self) -> Result<LoginMethod> {
        use inquire::Select;

        Select::new("Log in with:", LoginMethod::ALL.to_vec())
            .prompt()
            .map_err(|e| AppError::Prompt(e.to_string()))
    }

    #[cfg(not(feature = "interactive"))]
    fn choose_method(&self) -> Result<LoginMethod> {
        debug!("No login method given, using QQ");
        Ok(LoginMethod::QqAccount)
    }

    #[cfg(feature = "interactive")]
    fn confirm_delete(&self) -> Result<bool> {
        use inquire::Confirm;

        Confirm::new("Delete the stored credential?")
            .with_default(false)
            .prompt()
            .map_err(|e| AppError::Prompt(e.to_string()))
    }

    #[cfg(not(feature = "interactive"))]
    fn confirm_delete(&self) -> Result<bool> {
        Err(AppError::Config(
            "refusing to delete without confirmation, pass --yes".into(),
        ))
    }
}

/// QR code image on disk for the duration of one login attempt.
struct QrFile {
    path: PathBuf,
}

impl QrFile {
    fn write(path: PathBuf, png: &[u8]) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, png)?;
        debug!(path = %path.display(), bytes = png.len(), "QR code written");
        Ok(Self { path })
    }
}

impl Drop for QrFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove QR code image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_qr_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr").join("code.png");

        let file = QrFile::write(path.clone(), PNG).unwrap();
        assert_eq!(fs::read(&path).unwrap(), PNG);
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_executor_resolves_backend() {
        let config = AppConfig {
            ip: Some("10.0.0.7:8021".into()),
            ..Default::default()
        };
        let executor = CommandExecutor::new(config, true).unwrap();
        assert_eq!(
            executor.controller.base_url().as_str(),
            "http://10.0.0.7:8021/plugins/GeQian.order_qqmusic"
        );
    }

    #[test]
    fn test_executor_rejects_bad_page_url() {
        let config = AppConfig {
            page_url: Some("::".into()),
            ..Default::default()
        };
        assert!(matches!(
            CommandExecutor::new(config, true),
            Err(AppError::Config(_))
        ));
    }
}
