// handlers/mod.rs - Two-tier handler layout
//
// Public (no token) -> Protected (bearer JWT + active account).
// Routes are assembled in `app.rs`; each area below keeps one file per
// resource and re-exports its handlers under `<action>_<method>` names.

pub mod protected;
pub mod public;

/*
HANDLER LAYOUT:

src/handlers/
├── public/
│   ├── auth/          ← POST /api/signup, /api/signin, /api/refresh-token
│   ├── invitations.rs ← POST /invitations/verify, /invitations/register
│   ├── upload.rs      ← GET /upload/image/:image_id/:filename
│   ├── scheme.rs      ← GET /scheme
│   └── system.rs      ← GET /, GET /health
└── protected/
    ├── auth/          ← GET /api/verify, POST /api/logout
    ├── items/         ← /items
    ├── scanner/       ← /scanner
    ├── requests.rs    ← /requests
    ├── user_scans.rs  ← /user-management
    ├── users/         ← /user
    ├── roles/         ← /roles, /permissions
    ├── organization.rs, invitations.rs, profile.rs, upload.rs
    └── scheme/        ← /scheme/...

Handlers return `ApiResult<T>`: the success envelope on Ok, and `ApiError`
rendered as `{success: false, error, message}` on Err.
*/
