use crate::interface::transport::{ShipResult, Transport, file_name};
use crate::model::error::transport::TransportError;
use crate::model::log::transport::TransportLog;
use crate::model::target::{TargetDefinition, TargetKind};
use async_trait::async_trait;
use macros::log;
use std::path::Path;
use tokio::process::Command;

const PUT_SUCCESS_MARKER: &str = "putting file";
const NAME_COLLISION: &str = "NT_STATUS_OBJECT_NAME_COLLISION";
const AUTH_FAILURES: [&str; 4] = [
    "NT_STATUS_LOGON_FAILURE",
    "NT_STATUS_ACCESS_DENIED",
    "NT_STATUS_ACCOUNT_DISABLED",
    "NT_STATUS_WRONG_PASSWORD",
];
const CONNECT_FAILURES: [&str; 5] = [
    "NT_STATUS_BAD_NETWORK_NAME",
    "NT_STATUS_CONNECTION_REFUSED",
    "NT_STATUS_HOST_UNREACHABLE",
    "NT_STATUS_IO_TIMEOUT",
    "Connection to",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbSession {
    pub service: String,
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
    pub port: Option<u16>,
}

impl SmbSession {
    pub fn from_target(target: &TargetDefinition) -> Result<Self, TransportError> {
        let credentials = &target.credentials;
        let host = target
            .require("host", &credentials.host)
            .map_err(TransportError::Unsupported)?;
        let share = target
            .require("share", &credentials.share)
            .map_err(TransportError::Unsupported)?;
        let username = target
            .require("username", &credentials.username)
            .map_err(TransportError::Unsupported)?;
        let password = target
            .require("password", &credentials.password)
            .map_err(TransportError::Unsupported)?;
        Ok(Self {
            service: format!("//{}/{}", host, share.trim_matches(|c| c == '/' || c == '\\')),
            username: username.to_string(),
            password: password.to_string(),
            domain: credentials.domain.clone().filter(|domain| !domain.is_empty()),
            port: credentials.port,
        })
    }

    /// Arguments for one `smbclient` invocation. The password travels through
    /// the `PASSWD` environment variable, not the command line.
    pub fn arguments(&self, command: &str) -> Vec<String> {
        let mut arguments = vec![self.service.clone(), "-U".to_string(), self.username.clone()];
        if let Some(domain) = &self.domain {
            arguments.push("-W".to_string());
            arguments.push(domain.clone());
        }
        if let Some(port) = self.port {
            arguments.push("-p".to_string());
            arguments.push(port.to_string());
        }
        arguments.push("-c".to_string());
        arguments.push(command.to_string());
        arguments
    }
}

/// Backslash-separated segments of a share-relative path.
pub fn share_segments(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_string)
        .collect()
}

pub fn share_path(segments: &[String]) -> String {
    segments.join("\\")
}

/// One `mkdir` per prefix of the destination, shallowest first.
pub fn mkdir_commands(destination: &str) -> Vec<String> {
    let segments = share_segments(destination);
    (1..=segments.len())
        .map(|depth| format!("mkdir \"{}\"", share_path(&segments[..depth])))
        .collect()
}

pub fn classify_failure(output: &str) -> TransportError {
    let summary = output.trim().to_string();
    if AUTH_FAILURES.iter().any(|marker| output.contains(marker)) {
        TransportError::Auth(summary)
    } else if CONNECT_FAILURES.iter().any(|marker| output.contains(marker)) {
        TransportError::Connect(summary)
    } else {
        TransportError::RemoteFs(summary)
    }
}

pub fn mkdir_succeeded(success: bool, output: &str) -> bool {
    output.contains(NAME_COLLISION) || (success && !output.contains("NT_STATUS_"))
}

pub fn put_succeeded(output: &str) -> bool {
    output.contains(PUT_SUCCESS_MARKER) && !output.contains("NT_STATUS_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Present { size: Option<u64> },
    Missing,
    Inconclusive,
}

pub fn verify_listing(success: bool, output: &str, file_name: &str) -> Verification {
    if output.contains("NT_STATUS_NO_SUCH_FILE") || output.contains("NT_STATUS_OBJECT_NAME_NOT_FOUND") {
        return Verification::Missing;
    }
    if !success {
        return Verification::Inconclusive;
    }
    output
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix(file_name))
        .map(|rest| Verification::Present {
            size: rest
                .split_whitespace()
                .find_map(|token| token.parse::<u64>().ok()),
        })
        .unwrap_or(Verification::Inconclusive)
}

pub struct SmbTransport {
    program: String,
}

impl SmbTransport {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, session: &SmbSession, command: &str) -> Result<(bool, String), TransportError> {
        let output = Command::new(&self.program)
            .args(session.arguments(command))
            .env("PASSWD", &session.password)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| TransportError::Unsupported(format!("cannot run {}: {err}", self.program)))?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((output.status.success(), text))
    }
}

#[async_trait]
impl Transport for SmbTransport {
    fn kind(&self) -> TargetKind {
        TargetKind::Smb
    }

    async fn ship(
        &self,
        local_file: &Path,
        target: &TargetDefinition,
    ) -> Result<ShipResult, TransportError> {
        let session = SmbSession::from_target(target)?;

        for command in mkdir_commands(&target.destination) {
            let (success, output) = self.run(&session, &command).await?;
            if !mkdir_succeeded(success, &output) {
                return Err(classify_failure(&output));
            }
        }

        let name = file_name(local_file)?;
        let mut segments = share_segments(&target.destination);
        segments.push(name.clone());
        let remote_path = share_path(&segments);

        let put = format!("put \"{}\" \"{}\"", local_file.display(), remote_path);
        let (_, output) = self.run(&session, &put).await?;
        if !put_succeeded(&output) {
            return Err(classify_failure(&output));
        }

        let listing = format!("ls \"{remote_path}\"");
        let verification = match self.run(&session, &listing).await {
            Ok((success, output)) => verify_listing(success, &output, &name),
            Err(_) => Verification::Inconclusive,
        };
        match verification {
            Verification::Present { size } => Ok(ShipResult { remote_path, remote_size: size }),
            Verification::Missing => Err(TransportError::RemoteFs(format!(
                "{remote_path} is not present on {} after upload",
                session.service
            ))),
            Verification::Inconclusive => {
                log!(TransportLog::SmbVerificationInconclusive { file: remote_path.clone() });
                Ok(ShipResult { remote_path, remote_size: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::target::Credentials;
    use chrono::Utc;

    fn target() -> TargetDefinition {
        TargetDefinition::new(
            "nas",
            TargetKind::Smb,
            "backups/nightly",
            Credentials {
                host: Some("nas.lan".into()),
                share: Some("/archive/".into()),
                domain: Some("WORKGROUP".into()),
                username: Some("backup".into()),
                password: Some("s3cret".into()),
                ..Credentials::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn arguments_keep_password_off_the_command_line() {
        let session = SmbSession::from_target(&target()).unwrap();
        let arguments = session.arguments("ls");
        assert_eq!(
            arguments,
            vec!["//nas.lan/archive", "-U", "backup", "-W", "WORKGROUP", "-c", "ls"]
        );
        assert!(arguments.iter().all(|argument| !argument.contains("s3cret")));
    }

    #[test]
    fn missing_password_is_rejected() {
        let mut target = target();
        target.credentials.password = None;
        assert!(matches!(
            SmbSession::from_target(&target),
            Err(TransportError::Unsupported { .. })
        ));
    }

    #[test]
    fn one_mkdir_per_segment() {
        assert_eq!(
            mkdir_commands("/backups/nightly\\2026/"),
            vec![
                "mkdir \"backups\"",
                "mkdir \"backups\\nightly\"",
                "mkdir \"backups\\nightly\\2026\"",
            ]
        );
        assert!(mkdir_commands("/").is_empty());
    }

    #[test]
    fn existing_directory_counts_as_created() {
        assert!(mkdir_succeeded(false, "NT_STATUS_OBJECT_NAME_COLLISION making remote directory \\backups"));
        assert!(mkdir_succeeded(true, ""));
        assert!(!mkdir_succeeded(false, "NT_STATUS_ACCESS_DENIED making remote directory \\backups"));
    }

    #[test]
    fn put_requires_success_marker() {
        assert!(put_succeeded(
            "putting file /tmp/a.tar.gz as \\backups\\a.tar.gz (5120.0 kb/s) (average 5120.0 kb/s)"
        ));
        assert!(!put_succeeded("NT_STATUS_DISK_FULL opening remote file \\backups\\a.tar.gz"));
        assert!(!put_succeeded(""));
    }

    #[test]
    fn failures_are_classified() {
        assert!(matches!(
            classify_failure("session setup failed: NT_STATUS_LOGON_FAILURE"),
            TransportError::Auth { .. }
        ));
        assert!(matches!(
            classify_failure("tree connect failed: NT_STATUS_BAD_NETWORK_NAME"),
            TransportError::Connect { .. }
        ));
        assert!(matches!(
            classify_failure("NT_STATUS_DISK_FULL"),
            TransportError::RemoteFs { .. }
        ));
    }

    #[test]
    fn listing_confirms_presence_and_size() {
        let output = "  a.tar.gz                            A    52428  Mon Oct 19 03:00:12 2026\n\n\t\t1021 blocks of size 4096. 33 blocks available\n";
        assert_eq!(
            verify_listing(true, output, "a.tar.gz"),
            Verification::Present { size: Some(52428) }
        );
        assert_eq!(
            verify_listing(false, "NT_STATUS_NO_SUCH_FILE listing \\backups\\a.tar.gz", "a.tar.gz"),
            Verification::Missing
        );
        assert_eq!(
            verify_listing(false, "do_list: something odd", "a.tar.gz"),
            Verification::Inconclusive
        );
    }

    #[cfg(unix)]
    mod adapter {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        const COLLISION: &str = "echo 'NT_STATUS_OBJECT_NAME_COLLISION making remote directory'; exit 1";
        const PUT_OK: &str = "echo 'putting file a.tar.gz as \\\\backups\\\\nightly\\\\a.tar.gz (10.0 kb/s)'";
        const LISTED: &str = "echo '  a.tar.gz   A   9  Mon Oct 19 03:00:12 2026'";

        struct Stub {
            directory: tempfile::TempDir,
            program: PathBuf,
            calls: PathBuf,
        }

        impl Stub {
            fn commands(&self) -> Vec<String> {
                std::fs::read_to_string(&self.calls)
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect()
            }

            fn archive(&self) -> PathBuf {
                let path = self.directory.path().join("a.tar.gz");
                std::fs::write(&path, b"123456789").unwrap();
                path
            }
        }

        // Records every `-c` command and answers mkdir, put and ls with the given shell bodies.
        fn stub(mkdir: &str, put: &str, ls: &str) -> Stub {
            let directory = tempfile::tempdir().unwrap();
            let program = directory.path().join("smbclient");
            let calls = directory.path().join("calls.log");
            let script = format!(
                "#!/bin/sh\n\
                 for last; do :; done\n\
                 printf '%s\\n' \"$last\" >> '{calls}'\n\
                 [ \"$PASSWD\" = 's3cret' ] || {{ echo 'NT_STATUS_LOGON_FAILURE'; exit 1; }}\n\
                 case \"$last\" in\n\
                 mkdir*) {mkdir} ;;\n\
                 put*) {put} ;;\n\
                 ls*) {ls} ;;\n\
                 esac\n",
                calls = calls.display(),
            );
            std::fs::write(&program, script).unwrap();
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
            Stub {
                directory,
                program,
                calls,
            }
        }

        #[tokio::test]
        async fn creates_directories_uploads_then_verifies() {
            let stub = stub(COLLISION, PUT_OK, LISTED);
            let transport = SmbTransport::new(stub.program.to_string_lossy());

            let result = transport.ship(&stub.archive(), &target()).await.unwrap();

            assert_eq!(result.remote_path, "backups\\nightly\\a.tar.gz");
            assert_eq!(result.remote_size, Some(9));
            let commands = stub.commands();
            assert_eq!(commands.len(), 4);
            assert_eq!(commands[0], "mkdir \"backups\"");
            assert_eq!(commands[1], "mkdir \"backups\\nightly\"");
            assert!(commands[2].starts_with("put \""));
            assert!(commands[2].ends_with("\"backups\\nightly\\a.tar.gz\""));
            assert_eq!(commands[3], "ls \"backups\\nightly\\a.tar.gz\"");
        }

        #[tokio::test]
        async fn failed_listing_after_marked_put_still_succeeds() {
            let stub = stub("exit 0", PUT_OK, "echo 'do_list: internal error'; exit 1");
            let transport = SmbTransport::new(stub.program.to_string_lossy());

            let result = transport.ship(&stub.archive(), &target()).await.unwrap();

            assert_eq!(result.remote_path, "backups\\nightly\\a.tar.gz");
            assert_eq!(result.remote_size, None);
        }

        #[tokio::test]
        async fn put_without_marker_fails_before_listing() {
            let stub = stub("exit 0", "echo 'NT_STATUS_DISK_FULL opening remote file'; exit 0", LISTED);
            let transport = SmbTransport::new(stub.program.to_string_lossy());

            let result = transport.ship(&stub.archive(), &target()).await;

            assert!(matches!(result, Err(TransportError::RemoteFs { .. })));
            assert!(stub.commands().iter().all(|command| !command.starts_with("ls")));
        }

        #[tokio::test]
        async fn listing_reporting_missing_file_fails() {
            let stub = stub("exit 0", PUT_OK, "echo 'NT_STATUS_NO_SUCH_FILE listing'; exit 1");
            let transport = SmbTransport::new(stub.program.to_string_lossy());

            let result = transport.ship(&stub.archive(), &target()).await;

            assert!(matches!(result, Err(TransportError::RemoteFs { .. })));
        }

        #[tokio::test]
        async fn rejected_mkdir_stops_the_upload() {
            let stub = stub("echo 'NT_STATUS_ACCESS_DENIED making remote directory'; exit 1", PUT_OK, LISTED);
            let transport = SmbTransport::new(stub.program.to_string_lossy());

            let result = transport.ship(&stub.archive(), &target()).await;

            assert!(matches!(result, Err(TransportError::Auth { .. })));
            assert_eq!(stub.commands(), vec!["mkdir \"backups\"".to_string()]);
        }
    }
}
