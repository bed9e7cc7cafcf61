use crate::dispatcher::RegistrationHandle;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        Validation(reason: String) {
            description("invalid event")
            display("invalid event: {}", reason)
        }

        UnknownHandle(handle: RegistrationHandle) {
            description("unknown registration handle")
            display("registration handle {} was not issued by this dispatcher", handle)
        }

        DispatcherClosed {
            description("dispatcher is closed")
            display("dispatcher has been shut down")
        }

        ObserverFailed(observer: String, cause: String) {
            description("observer failed")
            display("observer '{}' failed: {}", observer, cause)
        }

        Script(line: usize, message: String) {
            description("malformed event script")
            display("line {}: {}", line, message)
        }
    }
}
