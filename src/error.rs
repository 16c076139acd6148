use thiserror::Error;

#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("failed to read kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to infer cluster access config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("kubernetes API request failed: {0}")]
    Client(#[from] kube::Error),

    #[error("watch stream failed: {0}")]
    Stream(kube::Error),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("nodes file path {0} has no usable parent directory")]
    NoParent(String),

    #[error("failed to write nodes file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to replace nodes file: {0}")]
    Replace(#[from] tempfile::PersistError),
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("failed to list endpoints: {0}")]
    List(#[from] MembershipError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}
