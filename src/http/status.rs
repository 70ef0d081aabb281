use core::fmt;

macro_rules! status_codes {
    ($($name:ident = $code:literal, $reason:literal;)+) => {
        /// Well-known HTTP status codes.
        ///
        /// Responses are not limited to these; [`StatusCode::for_code`] returns
        /// `None` for anything outside the table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum StatusCode {
            $($name,)+
        }

        impl StatusCode {
            /// Every code in the table, in ascending declaration order.
            pub const ALL: &'static [StatusCode] = &[$(StatusCode::$name,)+];

            pub fn code(&self) -> u16 {
                match self {
                    $(StatusCode::$name => $code,)+
                }
            }

            pub fn reason(&self) -> &'static str {
                match self {
                    $(StatusCode::$name => $reason,)+
                }
            }

            pub fn for_code(code: u16) -> Option<StatusCode> {
                match code {
                    $($code => Some(StatusCode::$name),)+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Continue = 100, "Continue";
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritativeInformation = 203, "Non-Authoritative Information";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    NotModified = 304, "Not Modified";
    UseProxy = 305, "Use Proxy";
    TemporaryRedirect = 307, "Temporary Redirect";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    ProxyAuthenticationRequired = 407, "Proxy Authentication Required";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    PayloadTooLarge = 413, "Payload Too Large";
    UriTooLong = 414, "URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    HttpVersionNotSupported = 505, "HTTP Version Not Supported";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
    NetworkReadTimeout = 598, "Network Read Timeout";
}

impl StatusCode {
    /// The OK family: 200 through 208, and 226.
    pub fn is_ok_code(code: u16) -> bool {
        (200..=208).contains(&code) || code == 226
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
