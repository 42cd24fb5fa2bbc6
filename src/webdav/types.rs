/// WebDAV Depth used for listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
        }
    }
}

/// Status codes the dispatcher treats as redirects.
pub const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

pub fn is_redirect(status: u16) -> bool {
    REDIRECT_CODES.contains(&status)
}

/// Expected status sets, one per operation.
pub mod expect {
    pub const MKCOL: &[u16] = &[201];
    pub const MKCOL_EXIST_OK: &[u16] = &[201, 405];
    pub const RMDIR: &[u16] = &[204];
    pub const RMDIR_MISSING_OK: &[u16] = &[204, 404];
    pub const DELETE: &[u16] = &[204];
    pub const PUT: &[u16] = &[200, 201, 204];
    pub const GET: &[u16] = &[200];
    pub const PROPFIND: &[u16] = &[207];
}
