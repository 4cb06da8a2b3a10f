/// Types implementing WireSerialisable can be sent to a client over the
/// dispatch protocol's TCP connection.
pub trait WireSerialisable {
    /// Converts the value in question to its on-the-wire form, including the
    /// trailing CRLF.
    fn serialise_wire(&self) -> Vec<u8>;
}
