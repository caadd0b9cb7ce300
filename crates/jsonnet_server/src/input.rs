/// Messages the host may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Action(JsonnetAction),
    Autocmd(Autocmd),
    Request(Request),
    Exit,
    Other(String),
}

/// Commands invoked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonnetAction {
    Preview,
    PreviewToSide,
}

impl JsonnetAction {
    pub fn side_by_side(self) -> bool {
        matches!(self, Self::PreviewToSide)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Autocmd {
    BufWritePost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ProvideContent,
    Completion,
    Hover,
}

impl Event {
    pub fn from_method(method: &str) -> Self {
        match method {
            "jsonnet.preview" => Self::Action(JsonnetAction::Preview),
            "jsonnet.previewToSide" => Self::Action(JsonnetAction::PreviewToSide),
            "BufWritePost" => Self::Autocmd(Autocmd::BufWritePost),
            "preview/provideContent" => Self::Request(Request::ProvideContent),
            "completion" => Self::Request(Request::Completion),
            "hover" => Self::Request(Request::Hover),
            "exit" => Self::Exit,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Params of a `hover` request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct HoverParams {
    pub uri: String,
    /// 0-based.
    pub line: u32,
    /// 0-based, in characters.
    pub character: u32,
}
