//! Static text served by the index and usage routes.

/// Services mounted by this process, as `(path, name)`.
pub const SERVICES: &[(&str, &str)] = &[("/lock", "Cryptographic time-locks")];

/// Plain-text listing of the mounted services.
pub fn service_index() -> String {
    let mut txt = String::from("Drizer HTTP Services\n\n");
    for (path, name) in SERVICES {
        txt.push_str(&format!("{} -> {}\n", path, name));
    }
    txt
}

pub const USAGE_PAGE: &str = r#"<!doctype html>
<head>
    <style>
        html, body {
            font-family: monospace;
            font-size: 15px;
        }
        pre {
            background: #eee;
            padding: 5px;
        }
    </style>
    <title>Time-lock encryption service</title>
</head>
<body>
    <h1>Time-lock encryption service</h1>
    <div>
        <h2>GET /lock/create</h2>
        Generate an RSA key pair and return the PUBLIC key.
        <h4>Param: time</h4>
        <small>The time in seconds until the private key is made available (60 to 31556926).</small>
        <pre>
GET /lock/create?time=3600

{"error":false,"id":...,"publicKey":"...","unlockTime":...}</pre>

        <h2>GET /lock/release</h2>
        Get the PRIVATE key for a lock ID created by /lock/create. Fails if the lock time has not passed yet.
        <h4>Param: id</h4>
        <small>The ID returned by /lock/create.</small>
        <pre>
GET /lock/release?id=...

{"error":false,"privateKey":...,"message":"Ok.","remaining":0}</pre>

        <h2>GET /lock/info</h2>
        Get details about a lock.
        <h4>Param: id</h4>
        <small>The ID returned by /lock/create.</small>
        <pre>
GET /lock/info?id=...

{"error":false,"created":...,"locked":...,"remaining":...}</pre>
    </div>
</body>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_index_lists_lock_service() {
        let index = service_index();
        assert!(index.starts_with("Drizer HTTP Services\n\n"));
        assert!(index.contains("/lock -> Cryptographic time-locks\n"));
    }
}
